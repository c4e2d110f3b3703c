//! Plain-text views over controller state.

use client_core::{
    DashboardView, ListView, RecommendationPayload, RecommendationPhase, RecommendationState,
    TrainingPhase,
};
use shared::{
    domain::{Algorithm, ResourceKind},
    protocol::{
        ComparisonResult, InteractionReceipt, ModelReadiness, RecommendationResult,
        ResourceRecord, ScoredItem,
    },
};

/// Columns printed for each kind, after the id.
fn columns(kind: ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::Person => &["nome", "email", "id_universidade"],
        ResourceKind::Venue => &["descricao", "endereco", "cidade", "id_categoria"],
        ResourceKind::Preference => &["nome_preferencia", "tipo_preferencia"],
        ResourceKind::Affiliation => &["nome", "cidade", "estado"],
        ResourceKind::Category => &["nome_categoria"],
    }
}

pub fn list(view: &ListView) -> String {
    let visible = view.visible();
    let mut out = format!(
        "{} ({} of {})\n",
        view.kind.collection_path().trim_start_matches('/'),
        visible.len(),
        view.items.len()
    );
    if let Some(error) = &view.error {
        out.push_str(&format!("! {error}\n"));
    }
    for record in visible {
        out.push_str(&row(view, record));
        out.push('\n');
    }
    if let Some(reference) = view.kind.schema().reference {
        out.push_str(&format!(
            "({} {} available for selection)\n",
            view.references.len(),
            reference.collection_path().trim_start_matches('/')
        ));
    }
    out
}

fn row(view: &ListView, record: &ResourceRecord) -> String {
    let reference_field = view.kind.schema().reference_field;
    let label = view.reference_label(record);
    let cells: Vec<String> = columns(view.kind)
        .iter()
        .map(|column| {
            match (record.field(column).filter(|value| value.is_present()), &label) {
                (Some(_), Some(label)) if reference_field == Some(*column) => label.clone(),
                (Some(value), _) => value.to_string(),
                (None, _) => "-".into(),
            }
        })
        .collect();
    format!("#{} {}", record.id, cells.join(" | "))
}

pub fn record(kind: ResourceKind, record: &ResourceRecord) -> String {
    let mut out = format!("{kind} #{}\n", record.id);
    for (name, value) in &record.fields {
        out.push_str(&format!("  {name}: {value}\n"));
    }
    out
}

fn ranking(out: &mut String, items: &[ScoredItem]) {
    if items.is_empty() {
        out.push_str("  (no recommendations)\n");
    }
    for (rank, item) in items.iter().enumerate() {
        out.push_str(&format!(
            "  {:>2}. venue #{} {} score={:.3}",
            rank + 1,
            item.venue_id,
            item.label,
            item.score
        ));
        if let Some(reason) = &item.reason {
            out.push_str(&format!(" ({reason})"));
        }
        out.push('\n');
    }
}

fn single(out: &mut String, result: &RecommendationResult) {
    out.push_str(&format!("{}:\n", result.algorithm.label()));
    ranking(out, &result.items);
}

fn comparison(out: &mut String, result: &ComparisonResult) {
    for algorithm in Algorithm::ALL {
        out.push_str(&format!("{}:\n", algorithm.label()));
        ranking(out, result.items(algorithm));
    }
    if let Some(overlap) = &result.overlap {
        out.push_str(&format!(
            "overlap: {} in common ({:.1}%)\n",
            overlap.common_count, overlap.common_percent
        ));
    }
}

pub fn recommendations(state: &RecommendationState) -> String {
    let mut out = match state.subject {
        Some(subject) => format!("subject #{subject}\n"),
        None => String::new(),
    };
    match &state.phase {
        RecommendationPhase::Idle => out.push_str("nothing requested\n"),
        RecommendationPhase::Loading => out.push_str("loading...\n"),
        RecommendationPhase::Ready(RecommendationPayload::Single(result)) => {
            single(&mut out, result)
        }
        RecommendationPhase::Ready(RecommendationPayload::Comparison(result)) => {
            comparison(&mut out, result)
        }
        RecommendationPhase::Failed(message) => out.push_str(&format!("! {message}\n")),
    }
    out
}

pub fn training(algorithm: Algorithm, phase: &TrainingPhase) -> String {
    match phase {
        TrainingPhase::Idle => format!("{}: not started\n", algorithm.label()),
        TrainingPhase::Submitting { started_at } => format!(
            "{}: training since {}\n",
            algorithm.label(),
            started_at.format("%H:%M:%S")
        ),
        TrainingPhase::Succeeded(report) => {
            let mut out = format!(
                "{}: {} ({}s)\n",
                algorithm.label(),
                report.result.message,
                report.elapsed().num_seconds()
            );
            if let Some(metrics) = &report.result.metrics {
                let pretty =
                    serde_json::to_string_pretty(metrics).unwrap_or_else(|_| metrics.to_string());
                out.push_str(&format!("metrics: {pretty}\n"));
            }
            out
        }
        TrainingPhase::Failed { message } => format!("{}: ! {message}\n", algorithm.label()),
    }
}

fn readiness(value: ModelReadiness) -> &'static str {
    match value {
        ModelReadiness::Trained => "trained",
        ModelReadiness::NotTrained => "not trained",
        ModelReadiness::Unknown => "unknown",
    }
}

pub fn dashboard(view: &DashboardView) -> String {
    let mut out = match &view.error {
        Some(error) => format!("! {error}\n"),
        None => String::new(),
    };
    let Some(snapshot) = &view.snapshot else {
        return out;
    };
    let health = &snapshot.health;
    out.push_str(&format!(
        "status:   {}\napi:      {}\ndatabase: {}\n",
        health.status, health.api, health.database
    ));
    for algorithm in Algorithm::ALL {
        out.push_str(&format!(
            "model {}: {}\n",
            algorithm,
            readiness(health.models.readiness(algorithm))
        ));
    }
    out.push_str(&format!(
        "sample: {} people, {} venues, {} preferences\n",
        snapshot.people.len(),
        snapshot.venues.len(),
        snapshot.preferences.len()
    ));
    out
}

pub fn receipt(receipt: &InteractionReceipt) -> String {
    format!(
        "{} (subject #{}, venue #{}, score {})\n",
        receipt.message, receipt.subject_id, receipt.venue_id, receipt.score
    )
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
