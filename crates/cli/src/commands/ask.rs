//! `flightdeck ask`: one question, streamed to the terminal.

use flightdeck_core::event::{AgentEvent, EventKind, EventPayload};

pub async fn run(question: String, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let agent = super::build_agent(&config).await?;

    let mut run = agent.run(question);
    let mut failure = None;

    loop {
        let event = tokio::select! {
            event = run.next_event() => event,
            _ = tokio::signal::ctrl_c() => {
                run.cancel();
                return Err("Interrupted".into());
            }
        };
        let Some(event) = event else { break };

        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            print_event(&event);
        }

        if event.kind == EventKind::Error && event.is_terminal() {
            failure = Some(event.description.clone());
        }
    }

    match failure {
        Some(reason) => Err(reason.into()),
        None => Ok(()),
    }
}

fn print_event(event: &AgentEvent) {
    match (&event.kind, &event.payload) {
        (EventKind::Annotation, _) if event.description.is_empty() => {
            eprintln!("  * {}", event.title);
        }
        (EventKind::Annotation, _) => {
            eprintln!("  * {}: {}", event.title, event.description);
        }
        (EventKind::ToolCall, Some(EventPayload::ToolCall { tool, args })) => {
            eprintln!("  -> {tool} {args}");
        }
        (EventKind::ToolResult, Some(EventPayload::ToolResult { tool, .. })) => {
            eprintln!("  <- {tool} ok");
        }
        (EventKind::Error, _) => {
            eprintln!("  [Error] {}: {}", event.title, event.description);
        }
        (EventKind::Message, Some(EventPayload::Message { content })) => {
            println!("{content}");
        }
        _ => {}
    }
}
