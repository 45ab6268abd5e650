//! One workflow operation per invocation.

use crate::render;
use crate::Command;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use sk_core::config::ClientConfig;
use sk_core::streaming::StreamOutcome;
use sk_core::transport::{HttpTransport, SourceFile};
use sk_core::workflow::{WorkflowManager, WriteOutcome};
use sk_protocol::Event;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc;

pub async fn run(command: Command, project: Option<String>, config: ClientConfig) -> Result<()> {
    let transport = HttpTransport::new(config.clone()).context("Failed to build HTTP client")?;
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let manager = WorkflowManager::new(Arc::new(transport), config, events_tx);
    execute(&manager, &mut events, command, project).await
}

async fn execute(
    manager: &WorkflowManager,
    events: &mut mpsc::UnboundedReceiver<Event>,
    command: Command,
    project: Option<String>,
) -> Result<()> {
    match command {
        Command::Health => {
            let health = manager.health_check().await?;
            render::health(&health);
        }
        Command::Projects => {
            let projects = manager.load_projects().await?;
            render::projects(&projects);
        }
        Command::Create {
            name,
            duration,
            methodology,
            language,
        } => {
            let mut request = manager.new_project_request(name);
            if let Some(duration) = duration {
                request.target_duration_minutes = duration;
            }
            if let Some(methodology) = methodology {
                request.methodology = methodology;
            }
            if let Some(language) = language {
                request.language = language;
            }
            let id = manager.create_project(request).await?;
            println!("{} {}", "Created project".green(), id.bold());
        }
        Command::Delete { project_id } => {
            manager.delete_project(&project_id).await?;
            println!("{} {project_id}", "Deleted".green());
        }
        Command::Methodologies { id: None } => {
            let methodologies = manager.list_methodologies().await?;
            render::methodologies(&methodologies);
        }
        Command::Methodologies { id: Some(id) } => {
            let detail = manager.get_methodology(&id).await?;
            render::methodology_detail(&detail);
        }
        command => {
            let project_id = project.context("This command needs --project <ID>")?;
            manager.select_project(&project_id).await?;
            execute_on_project(manager, events, command).await?;
        }
    }
    Ok(())
}

async fn execute_on_project(
    manager: &WorkflowManager,
    events: &mut mpsc::UnboundedReceiver<Event>,
    command: Command,
) -> Result<()> {
    match command {
        Command::Show => render::state(&manager.snapshot().await),
        Command::Upload { path } => {
            let source = SourceFile::from_path(&path).await?;
            let response = manager.upload_source(source).await?;
            println!("{} {}", "Uploaded".green(), response.file_name);
        }
        Command::Analyze => {
            let concepts = manager.analyze_source().await?;
            render::concepts(&concepts);
        }
        Command::SelectConcept { number } => {
            if number == 0 {
                bail!("Concept numbers start at 1");
            }
            let protagonist = manager.select_concept(number - 1).await?;
            render::character(&protagonist);
        }
        Command::BeatSheet { methodology } => {
            let beat_sheet = manager
                .create_beat_sheet(methodology.as_deref().unwrap_or_default())
                .await?;
            render::beat_sheet(&beat_sheet);
        }
        Command::Outline => {
            let outlines = manager.create_scene_outlines().await?;
            render::outlines(&outlines);
        }
        Command::Write { stream: false } => match manager.write_next_scene().await? {
            WriteOutcome::Written {
                scene,
                quality_notes,
                user_guidance,
            } => {
                render::scene(&scene);
                render::notes(quality_notes.as_deref(), user_guidance.as_deref());
            }
            WriteOutcome::AllScenesCompleted { message } => {
                println!(
                    "{}",
                    message.unwrap_or_else(|| "All scenes are written".to_string()).green()
                );
            }
            WriteOutcome::Superseded => bail!("The project changed while the scene was being written"),
        },
        Command::Write { stream: true } => stream_scene(manager, events).await?,
        Command::Approve { scene } => {
            manager.approve_scene(scene).await?;
            println!("{} {scene}", "Approved scene".green());
        }
        Command::Expand { scene } => render::scene(&*manager.expand_scene(scene).await?),
        Command::Revise { scene, notes } => {
            render::scene(&*manager.revise_scene(scene, &notes).await?);
        }
        Command::Optimize => render::report(&manager.run_optimization().await?),
        Command::Export { format, output } => {
            let text = manager.export(format).await?.to_text();
            match output {
                Some(path) => {
                    tokio::fs::write(&path, text)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("{} {}", "Exported to".green(), path.display());
                }
                None => println!("{text}"),
            }
        }
        Command::Context => match manager.refresh_context_status().await {
            Some(status) => render::context(&status),
            None => bail!("Context status is unavailable"),
        },
        Command::Status => {
            let status = manager.project_status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        other => bail!("{other:?} does not take a project"),
    }
    Ok(())
}

/// Stream the next scene, printing chunks as they arrive. Ctrl-C cancels.
async fn stream_scene(
    manager: &WorkflowManager,
    events: &mut mpsc::UnboundedReceiver<Event>,
) -> Result<()> {
    let subscription = manager.stream_next_scene().await?;
    let cancel = subscription.cancel_handle();
    let finished = subscription.finished();
    tokio::pin!(finished);

    let mut stdout = std::io::stdout();
    let mut interrupted = false;
    let outcome = loop {
        tokio::select! {
            outcome = &mut finished => break outcome,
            Some(event) = events.recv() => print_chunk(&mut stdout, event),
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                cancel.cancel();
            }
        }
    };
    while let Ok(event) = events.try_recv() {
        print_chunk(&mut stdout, event);
    }
    println!();

    match outcome {
        StreamOutcome::Completed(_) => {
            let state = manager.snapshot().await;
            println!(
                "{} {}/{}",
                "Scene written.".green(),
                state.scenes_written(),
                state.total_scenes()
            );
            Ok(())
        }
        StreamOutcome::Cancelled => {
            println!("{}", "Cancelled; partial text kept above.".yellow());
            Ok(())
        }
        StreamOutcome::Failed(e) => Err(e.into()),
    }
}

fn print_chunk(stdout: &mut std::io::Stdout, event: Event) {
    match event {
        Event::StreamChunk { chunk, .. } => {
            let _ = write!(stdout, "{chunk}");
            let _ = stdout.flush();
        }
        other => tracing::trace!(event = ?other, "event"),
    }
}
