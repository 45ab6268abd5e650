//! Plain-text rendering of backend results.

use colored::Colorize;
use sk_core::workflow::WorkflowState;
use sk_protocol::{
    BeatSheet, CharacterCard, ContextLevel, ContextStatus, FilmConcept, HealthStatus, Methodology,
    MethodologyDetail, OptimizationReport, ProjectSummary, Scene, SceneOutline, SceneStatus,
    WorkflowStep,
};

pub fn health(health: &HealthStatus) {
    let status = if health.is_healthy() {
        health.status.green()
    } else {
        health.status.red()
    };
    println!("Backend: {status}");
    println!("API key configured: {}", health.api_key_configured);
    println!("Projects: {}", health.projects_count);
}

pub fn projects(projects: &[ProjectSummary]) {
    if projects.is_empty() {
        println!("No projects yet.");
        return;
    }
    for project in projects {
        let created = project
            .created_at
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "{}  {}  {:>5.1}%  {}",
            project.id.dimmed(),
            project.name.bold(),
            project.progress,
            created
        );
    }
}

pub fn methodologies(methodologies: &[Methodology]) {
    for m in methodologies {
        println!("{}  {} ({})", m.id.bold(), m.name, m.author);
        if !m.description.is_empty() {
            println!("    {}", m.description);
        }
    }
}

pub fn methodology_detail(detail: &MethodologyDetail) {
    let m = &detail.methodology;
    println!("{} by {}", m.name.bold(), m.author);
    if !m.best_for.is_empty() {
        println!("Best for: {}", m.best_for.join(", "));
    }
    for step in &detail.steps {
        println!(
            "{:>3}. {} / {}  (act {}, {:.0}%)",
            step.number, step.name, step.english_name, step.act, step.percentage_of_story
        );
    }
}

pub fn state(state: &WorkflowState) {
    let name = state
        .current_project
        .as_ref()
        .map(|p| p.name.as_str())
        .unwrap_or("-");
    println!("{}", name.bold());

    for step in WorkflowStep::ALL {
        let marker = if step == state.step {
            "▶".cyan()
        } else if state.completed_steps().contains(&step) {
            "✓".green()
        } else {
            "·".dimmed()
        };
        println!("  {marker} {}", step.title());
    }

    let artifacts = &state.artifacts;
    println!("Concepts: {}", artifacts.concepts.len());
    if let Some(protagonist) = &artifacts.protagonist {
        println!("Protagonist: {}", protagonist.name);
    }
    println!(
        "Scenes: {}/{} written, {} approved, {:.0}%",
        state.scenes_written(),
        state.total_scenes(),
        state.approved_count(),
        state.writing_progress()
    );
    let seconds = state.written_duration_seconds();
    println!("Written runtime: {}m {:02}s", seconds / 60, seconds % 60);
    if let Some(next) = state.next_outline() {
        println!("Next: scene {} at {}", next.scene_number, next.location);
    }
    if let Some(status) = &state.context_status {
        context(status);
    }
}

pub fn concepts(concepts: &[FilmConcept]) {
    for (i, concept) in concepts.iter().enumerate() {
        println!("{}. {} ({})", i + 1, concept.genre.bold(), concept.tone);
        println!("   {}", concept.logline);
    }
}

pub fn character(card: &CharacterCard) {
    println!("{}", card.name.bold());
    println!("Need: {}", card.dramatic_need);
    println!("Point of view: {}", card.point_of_view);
    println!("Attitude: {}", card.attitude);
    println!("Arc: {}", card.arc);
    if let Some(flaws) = &card.flaws {
        println!("Flaws: {}", flaws.join(", "));
    }
}

pub fn beat_sheet(sheet: &BeatSheet) {
    for beat in &sheet.beats {
        println!(
            "{:>3}. {}  ({}s)",
            beat.number,
            beat.name.bold(),
            beat.estimated_duration_seconds
        );
        println!("     {}", beat.description);
    }
    println!("Total: {} minutes", sheet.total_duration_minutes);
}

pub fn outlines(outlines: &[SceneOutline]) {
    for o in outlines {
        println!(
            "{:>3}. {} - {}  ({}s)",
            o.scene_number,
            o.location.bold(),
            o.time_of_day,
            o.duration_seconds
        );
        println!("     {}", o.brief_description);
    }
}

pub fn scene(scene: &Scene) {
    let status = match scene.status {
        SceneStatus::Draft => "draft".yellow(),
        SceneStatus::Approved => "approved".green(),
        SceneStatus::Revised => "revised".cyan(),
    };
    println!("{}  [{status}]", scene.header.bold());
    println!();
    println!("{}", scene.action);
    for line in &scene.dialogue {
        println!();
        println!("        {}", line.character.bold());
        if let Some(parenthetical) = &line.parenthetical {
            println!("      ({parenthetical})");
        }
        println!("    {}", line.line);
    }
}

pub fn notes(quality_notes: Option<&str>, user_guidance: Option<&str>) {
    if let Some(notes) = quality_notes {
        println!("\n{} {notes}", "Quality:".dimmed());
    }
    if let Some(guidance) = user_guidance {
        println!("{} {guidance}", "Guidance:".dimmed());
    }
}

pub fn report(report: &OptimizationReport) {
    println!("Overall score: {}/10", report.overall_score.to_string().bold());
    let sections = [
        ("Continuity", &report.continuity_issues),
        ("Plot holes", &report.plot_holes),
        ("Motivation", &report.motivation_issues),
        ("Clichés", &report.cliche_warnings),
        ("Passive protagonist", &report.passive_protagonist_issues),
        ("Robotic dialogue", &report.robotic_dialogue_issues),
        ("Recommendations", &report.recommendations),
    ];
    for (title, items) in sections {
        if items.is_empty() {
            continue;
        }
        println!("{}", title.bold());
        for item in items {
            println!("  - {item}");
        }
    }
    if !report.first_ten_minutes_check.is_empty() {
        println!("{} {}", "First ten minutes:".bold(), report.first_ten_minutes_check);
    }
}

pub fn context(status: &ContextStatus) {
    let usage = format!(
        "{:.1}% ({}/{} tokens)",
        status.percentage, status.current_tokens, status.max_tokens
    );
    let usage = match status.level {
        ContextLevel::Ok => usage.green(),
        ContextLevel::Warning => usage.yellow(),
        ContextLevel::Critical => usage.red(),
    };
    println!("Context: {usage}");
    if !status.message.is_empty() {
        println!("  {}", status.message);
    }
}
