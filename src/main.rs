use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Parser;
use concierge::core::config::{home_dir, load_config, resolve};
use concierge::core::feedback::{Issue, SupportOption};
use concierge::core::identity::{Identity, load_or_create};
use concierge::core::schedule::ScheduleField;
use concierge::core::suggestions::SuggestionScheduler;
use concierge::core::view::{FeedbackView, ViewModel, render};
use concierge::core::{Action, Session};
use concierge::runtime::Runtime;
use concierge::services::{AnalyticsClient, QuestionClient};
use concierge::transport::HttpTransport;
use log::{info, warn};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use tokio::io::{AsyncBufReadExt, BufReader};

const WIDTH: usize = 80;

const HELP: &str = "\
Commands:
  <text>              ask a question
  /s <n>              ask suggested question n
  /yes | /no          answer \"was this helpful?\"
  /issue <n>          toggle feedback issue n
  /other <text>       describe the \"other\" issue
  /support rephrase|human
  /submit | /cancel   feedback form
  /callback           open the callback form
  /name <x> | /phone <x> | /vehicle <x>
  /send | /discard    callback form
  /full               toggle fullscreen
  /quit";

#[derive(Parser)]
#[command(name = "concierge", about = "Terminal host for the Concierge support widget")]
struct Args {
    /// Path to config file (defaults to ~/.concierge/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Chat backend URL (overrides config file and CONCIERGE_CHAT_URL)
    #[arg(long)]
    chat_url: Option<String>,
}

/// Turns one typed line into actions. `Err` carries text to show the user.
fn parse_command(line: &str, suggestions: &[String]) -> Result<Vec<Action>, String> {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return Ok(vec![Action::EditInput(line.to_string()), Action::SubmitInput]);
    };
    let (name, arg) = match command.split_once(' ') {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    let action = match name {
        "s" => {
            let question = arg
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| suggestions.get(i))
                .ok_or_else(|| format!("No suggestion {arg:?}"))?;
            Action::SelectSuggestion(question.clone())
        }
        "yes" => Action::FeedbackYes,
        "no" => Action::FeedbackNo,
        "issue" => {
            let issue = arg
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| Issue::ALL.get(i))
                .ok_or_else(|| format!("No issue {arg:?}"))?;
            Action::ToggleIssue(*issue)
        }
        "other" => Action::SetOtherText(arg.to_string()),
        "support" => match arg {
            "rephrase" => Action::ChooseSupport(SupportOption::Rephrase),
            "human" => Action::ChooseSupport(SupportOption::TalkToHuman),
            _ => return Err("Use /support rephrase or /support human".to_string()),
        },
        "submit" => Action::SubmitFeedback,
        "cancel" => Action::CancelFeedback,
        "callback" => Action::RequestCallback,
        "name" => Action::EditSchedule(ScheduleField::Name, arg.to_string()),
        "phone" => Action::EditSchedule(ScheduleField::PhoneNumber, arg.to_string()),
        "vehicle" => Action::EditSchedule(ScheduleField::VehicleType, arg.to_string()),
        "send" => Action::SubmitSchedule,
        "discard" => Action::CancelSchedule,
        "full" => Action::ToggleFullscreen,
        "quit" => Action::Close,
        _ => return Err(HELP.to_string()),
    };
    Ok(vec![action])
}

/// Prints the transcript incrementally and the controls below it when they change.
#[derive(Default)]
struct Printer {
    settled: usize,
    partial: usize,
    footer: String,
}

impl Printer {
    fn render(&mut self, view: &ViewModel, streaming: bool) {
        let mut out = std::io::stdout().lock();
        let total = view.turns.len();

        for (idx, turn) in view.turns.iter().enumerate().skip(self.settled) {
            let open = streaming && idx + 1 == total;
            if self.partial == 0 && open {
                let _ = write!(out, "{}: ", turn.label);
            }
            if self.partial > 0 || open {
                let _ = write!(out, "{}", &turn.text[self.partial.min(turn.text.len())..]);
                self.partial = turn.text.len();
                if open {
                    break;
                }
                let _ = writeln!(out);
            } else {
                let marker = if turn.is_error { " [error]" } else { "" };
                let text = format!("{}{}: {}", turn.label, marker, turn.text);
                let _ = writeln!(out, "{}", textwrap::fill(&text, WIDTH));
            }
            self.settled = idx + 1;
            self.partial = 0;
        }

        let footer = if streaming { String::new() } else { footer(view) };
        if footer != self.footer {
            if !footer.is_empty() {
                let _ = writeln!(out, "{footer}");
            }
            self.footer = footer;
        }
        let _ = out.flush();
    }
}

fn footer(view: &ViewModel) -> String {
    let mut lines = Vec::new();
    if let Some(banner) = view.banner {
        lines.push(format!("[{banner}]"));
    }
    if let Some(feedback) = view.turns.iter().rev().find_map(|t| t.feedback.as_ref()) {
        match feedback {
            FeedbackView::Prompt => lines.push("Was this helpful? /yes /no".to_string()),
            FeedbackView::Acknowledged => lines.push("Thank you for your feedback!".to_string()),
            FeedbackView::Form {
                issues,
                other_text,
                support,
                can_submit,
            } => {
                for (n, (issue, checked)) in issues.iter().enumerate() {
                    let mark = if *checked { "x" } else { " " };
                    lines.push(format!("  [{mark}] {} {}", n + 1, issue.label()));
                }
                if let Some(text) = other_text {
                    lines.push(format!("  other: {text}"));
                }
                if let Some(option) = support {
                    lines.push(format!("  support: {}", option.label()));
                }
                if *can_submit {
                    lines.push("  /submit to send feedback".to_string());
                }
            }
        }
    }
    if let Some(form) = &view.schedule {
        lines.push("Request a callback:".to_string());
        lines.push(format!("  name: {}", form.name));
        lines.push(format!("  phone: {}", form.phone_number));
        let vehicle = form.vehicle_type.map(|v| v.label()).unwrap_or("-");
        lines.push(format!("  vehicle: {vehicle}"));
        if let Some(error) = &form.error {
            lines.push(format!("  ! {error}"));
        }
        if form.submitting {
            lines.push("  submitting...".to_string());
        }
    }
    for (n, question) in view.suggestions.iter().enumerate() {
        lines.push(format!("  /s {} {}", n + 1, question));
    }
    lines.join("\n")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to concierge.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(log_file) = File::create("concierge.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = load_config(args.config.as_deref())?;
    let config = resolve(&file_config, args.chat_url.as_deref());
    info!("Concierge starting up, chat backend at {}", config.chat_url);

    let identity = match home_dir() {
        Some(dir) => load_or_create(&dir).unwrap_or_else(|e| {
            warn!("Identity store unavailable, using ephemeral identity: {}", e);
            Identity::ephemeral()
        }),
        None => Identity::ephemeral(),
    };

    let transport = HttpTransport::new(config.chat_url.clone(), identity.clone())
        .with_events_url(format!("{}/events", config.analytics_url.trim_end_matches('/')));
    let scheduler = SuggestionScheduler::new(
        Arc::new(QuestionClient::new(config.questions_url.clone())),
        config.initial_suggested_questions.clone(),
        config.show_number_of_questions,
    );
    let analytics = AnalyticsClient::new(config.analytics_url.clone());

    let mut runtime = Runtime::new(
        Session::new(config, identity),
        Arc::new(transport),
        scheduler,
        Arc::new(analytics),
    );
    let handle = runtime.handle();
    let shown_suggestions: Arc<Mutex<Vec<String>>> = Arc::default();

    runtime.start();
    let _ = handle.send(Action::Open);

    let reader_suggestions = shown_suggestions.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            let suggestions = reader_suggestions
                .lock()
                .map(|s| s.clone())
                .unwrap_or_default();
            match parse_command(&line, &suggestions) {
                Ok(actions) => {
                    for action in actions {
                        if handle.send(action).is_err() {
                            return;
                        }
                    }
                }
                Err(message) => println!("{message}"),
            }
        }
        // EOF closes the widget
        let _ = handle.send(Action::Close);
    });

    println!("{HELP}\n");
    let mut printer = Printer::default();
    runtime
        .run(|session| {
            let view = render(session);
            if let Ok(mut shown) = shown_suggestions.lock() {
                *shown = view.suggestions.clone();
            }
            printer.render(&view, session.is_streaming());
        })
        .await;

    // Let fire-and-forget close analytics go out
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    info!("Concierge shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestions() -> Vec<String> {
        vec!["first?".to_string(), "second?".to_string()]
    }

    #[test]
    fn test_plain_text_submits_draft() {
        let actions = parse_command("  hello there ", &[]).unwrap();
        assert!(matches!(&actions[0], Action::EditInput(t) if t == "hello there"));
        assert!(matches!(actions[1], Action::SubmitInput));
    }

    #[test]
    fn test_select_suggestion_by_number() {
        let actions = parse_command("/s 2", &suggestions()).unwrap();
        assert!(matches!(&actions[0], Action::SelectSuggestion(q) if q == "second?"));
        assert!(parse_command("/s 0", &suggestions()).is_err());
        assert!(parse_command("/s 3", &suggestions()).is_err());
    }

    #[test]
    fn test_feedback_commands() {
        let actions = parse_command("/issue 5", &[]).unwrap();
        assert!(matches!(actions[0], Action::ToggleIssue(Issue::Other)));
        let actions = parse_command("/support human", &[]).unwrap();
        assert!(matches!(
            actions[0],
            Action::ChooseSupport(SupportOption::TalkToHuman)
        ));
        assert!(parse_command("/support maybe", &[]).is_err());
    }

    #[test]
    fn test_schedule_commands_keep_argument() {
        let actions = parse_command("/name Asha Rao", &[]).unwrap();
        assert!(matches!(
            &actions[0],
            Action::EditSchedule(ScheduleField::Name, v) if v == "Asha Rao"
        ));
    }

    #[test]
    fn test_unknown_command_shows_help() {
        assert_eq!(parse_command("/dance", &[]).unwrap_err(), HELP);
    }
}
