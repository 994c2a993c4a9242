//! # Callback Form
//!
//! Collects name, phone number and vehicle type when the user wants a human
//! to call back. Validation is sequential: only the first missing field is
//! reported.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::transport::CallbackDetails;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleType {
    Car,
    #[serde(rename = "SUV")]
    Suv,
    Van,
    Bike,
    Scooter,
    Truck,
    Bus,
    Agricultural,
    Industrial,
    Earthmover,
}

impl VehicleType {
    pub const ALL: [VehicleType; 10] = [
        VehicleType::Car,
        VehicleType::Suv,
        VehicleType::Van,
        VehicleType::Bike,
        VehicleType::Scooter,
        VehicleType::Truck,
        VehicleType::Bus,
        VehicleType::Agricultural,
        VehicleType::Industrial,
        VehicleType::Earthmover,
    ];

    pub fn label(self) -> &'static str {
        match self {
            VehicleType::Car => "Car",
            VehicleType::Suv => "SUV",
            VehicleType::Van => "Van",
            VehicleType::Bike => "Bike",
            VehicleType::Scooter => "Scooter",
            VehicleType::Truck => "Truck",
            VehicleType::Bus => "Bus",
            VehicleType::Agricultural => "Agricultural",
            VehicleType::Industrial => "Industrial",
            VehicleType::Earthmover => "Earthmover",
        }
    }
}

impl FromStr for VehicleType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        VehicleType::ALL
            .into_iter()
            .find(|v| v.label().eq_ignore_ascii_case(wanted))
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleField {
    Name,
    PhoneNumber,
    VehicleType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleFields {
    pub name: String,
    pub phone_number: String,
    pub vehicle_type: Option<VehicleType>,
}

impl ScheduleFields {
    /// Applies a raw edit. An unknown vehicle label unselects the vehicle.
    pub fn set(&mut self, field: ScheduleField, value: &str) {
        match field {
            ScheduleField::Name => self.name = value.to_string(),
            ScheduleField::PhoneNumber => self.phone_number = value.to_string(),
            ScheduleField::VehicleType => self.vehicle_type = value.parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    MissingName,
    MissingPhone,
    MissingVehicleType,
    /// Lead capture could not be delivered. Retryable.
    SubmissionFailed,
}

impl ScheduleError {
    /// The field the error points at, if any.
    pub fn field(self) -> Option<ScheduleField> {
        match self {
            ScheduleError::MissingName => Some(ScheduleField::Name),
            ScheduleError::MissingPhone => Some(ScheduleField::PhoneNumber),
            ScheduleError::MissingVehicleType => Some(ScheduleField::VehicleType),
            ScheduleError::SubmissionFailed => None,
        }
    }
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::MissingName => write!(f, "Please enter your name"),
            ScheduleError::MissingPhone => write!(f, "Please enter your phone number"),
            ScheduleError::MissingVehicleType => write!(f, "Please select your vehicle type"),
            ScheduleError::SubmissionFailed => {
                write!(f, "Failed to submit callback request. Please try again.")
            }
        }
    }
}

impl std::error::Error for ScheduleError {}

pub fn validate(fields: &ScheduleFields) -> Result<CallbackDetails, ScheduleError> {
    if fields.name.trim().is_empty() {
        return Err(ScheduleError::MissingName);
    }
    if fields.phone_number.trim().is_empty() {
        return Err(ScheduleError::MissingPhone);
    }
    let vehicle = fields.vehicle_type.ok_or(ScheduleError::MissingVehicleType)?;
    Ok(CallbackDetails {
        name: fields.name.clone(),
        phone_number: fields.phone_number.clone(),
        vehicle_type: vehicle.label().to_string(),
    })
}

/// Human-readable transcript entry for a submitted request.
pub fn summary(details: &CallbackDetails) -> String {
    format!(
        "I'd like to request a callback with the following details:\n- Name: {}\n- Phone Number: {}\n- Vehicle Type: {}",
        details.name, details.phone_number, details.vehicle_type
    )
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ScheduleForm {
    #[default]
    Closed,
    Open {
        fields: ScheduleFields,
        error: Option<ScheduleError>,
    },
    /// Lead capture in flight.
    Submitting { fields: ScheduleFields },
    /// Hidden, fields kept until the clear timer fires.
    Submitted { fields: ScheduleFields },
}

impl ScheduleForm {
    /// Opens the form. An already open form keeps what the user typed.
    pub fn open(&mut self) {
        if !matches!(self, ScheduleForm::Open { .. } | ScheduleForm::Submitting { .. }) {
            *self = ScheduleForm::Open {
                fields: ScheduleFields::default(),
                error: None,
            };
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ScheduleForm::Open { .. })
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, ScheduleForm::Submitting { .. })
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, ScheduleForm::Submitted { .. })
    }

    /// Edits a field and clears any shown error.
    pub fn edit(&mut self, field: ScheduleField, value: &str) -> bool {
        match self {
            ScheduleForm::Open { fields, error } => {
                fields.set(field, value);
                *error = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) -> bool {
        if !self.is_open() {
            return false;
        }
        *self = ScheduleForm::Closed;
        true
    }

    /// Validates and, on success, moves to `Submitting`.
    /// On failure the error is shown and the fields are left as typed.
    pub fn begin_submit(&mut self) -> Result<CallbackDetails, ScheduleError> {
        let ScheduleForm::Open { fields, error } = self else {
            return Err(ScheduleError::SubmissionFailed);
        };
        match validate(fields) {
            Ok(details) => {
                *self = ScheduleForm::Submitting {
                    fields: std::mem::take(fields),
                };
                Ok(details)
            }
            Err(e) => {
                *error = Some(e);
                Err(e)
            }
        }
    }

    /// Lead capture succeeded: hide the form and hand back what to send.
    pub fn acknowledge(&mut self) -> Option<CallbackDetails> {
        let ScheduleForm::Submitting { fields } = self else {
            return None;
        };
        let details = validate(fields).ok()?;
        *self = ScheduleForm::Submitted {
            fields: std::mem::take(fields),
        };
        Some(details)
    }

    /// Lead capture failed: reopen with the data intact and a retryable error.
    pub fn fail(&mut self) -> bool {
        let ScheduleForm::Submitting { fields } = self else {
            return false;
        };
        *self = ScheduleForm::Open {
            fields: std::mem::take(fields),
            error: Some(ScheduleError::SubmissionFailed),
        };
        true
    }

    /// Drops the submitted fields.
    pub fn clear(&mut self) {
        if self.is_submitted() {
            *self = ScheduleForm::Closed;
        }
    }
}
