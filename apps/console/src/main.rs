use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    ComparisonStrategy, ConsoleApi, DashboardController, DeletionConfirmed, HttpConsoleClient,
    RecommendationController, RecommendationPhase, ResourceListController, TrainingController,
    TrainingPhase,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Algorithm, RecordId, ResourceKind, SubjectId, VenueId},
    protocol::{
        CollaborativeVariant, FieldValue, Fields, InteractionKind, InteractionRequest,
        LossFunction, TrainingOptions,
    },
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

#[derive(Parser, Debug)]
#[command(about = "Operator console for the recommendation service")]
struct Cli {
    /// Overrides the configured service address.
    #[arg(long, global = true)]
    api_base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Service, database and model readiness.
    Health,
    List {
        kind: ResourceKind,
        #[arg(long, default_value = "")]
        filter: String,
    },
    Show {
        kind: ResourceKind,
        id: i64,
    },
    /// Creates a record from `field=value` pairs.
    Create {
        kind: ResourceKind,
        #[arg(required = true)]
        fields: Vec<String>,
    },
    Update {
        kind: ResourceKind,
        id: i64,
        #[arg(required = true)]
        fields: Vec<String>,
    },
    Delete {
        kind: ResourceKind,
        id: i64,
        /// Confirms the deletion.
        #[arg(long)]
        yes: bool,
    },
    Recommend {
        subject: i64,
        #[arg(long, default_value = "hybrid")]
        algorithm: Algorithm,
        #[arg(long)]
        top_n: Option<u32>,
    },
    Compare {
        subject: i64,
        #[arg(long)]
        top_n: Option<u32>,
        /// One request per algorithm instead of the combined endpoint.
        #[arg(long)]
        parallel: bool,
    },
    ColdStart {
        subject: i64,
        #[arg(long, default_value = "hybrid")]
        algorithm: Algorithm,
        #[arg(long)]
        top_n: Option<u32>,
    },
    Interact {
        subject: i64,
        venue: i64,
        #[arg(value_parser = parse_wire::<InteractionKind>)]
        kind: InteractionKind,
        #[arg(long, default_value_t = 1.0)]
        weight: f64,
    },
    Train {
        algorithm: Algorithm,
        #[arg(long, value_parser = parse_wire::<LossFunction>)]
        loss: Option<LossFunction>,
        #[arg(long)]
        no_features: bool,
        #[arg(long, value_parser = parse_wire::<CollaborativeVariant>)]
        variant: Option<CollaborativeVariant>,
        #[arg(long)]
        epochs: Option<u32>,
        #[arg(long)]
        learning_rate: Option<f64>,
        #[arg(long)]
        components: Option<u32>,
    },
}

/// Parses a value by its wire name, e.g. `warp-kos` or `knn_basic`.
fn parse_wire<T: DeserializeOwned>(raw: &str) -> std::result::Result<T, String> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_ascii_lowercase()))
        .map_err(|_| format!("unrecognized value '{raw}'"))
}

/// Splits `name=value` arguments into record fields.
fn parse_assignments(raw: &[String]) -> Result<Fields> {
    let mut fields = Fields::new();
    for assignment in raw {
        let (name, value) = assignment
            .split_once('=')
            .with_context(|| format!("expected field=value, got '{assignment}'"))?;
        let name = name.trim();
        if name.is_empty() {
            bail!("missing field name in '{assignment}'");
        }
        fields.insert(name.to_string(), FieldValue::parse_literal(value));
    }
    Ok(fields)
}

fn training_options(
    loss: Option<LossFunction>,
    no_features: bool,
    variant: Option<CollaborativeVariant>,
    epochs: Option<u32>,
    learning_rate: Option<f64>,
    components: Option<u32>,
) -> TrainingOptions {
    let defaults = TrainingOptions::default();
    TrainingOptions {
        loss_function: loss.unwrap_or(defaults.loss_function),
        use_features: !no_features,
        algorithm_variant: variant.unwrap_or(defaults.algorithm_variant),
        epoch_count: epochs.unwrap_or(defaults.epoch_count),
        learning_rate,
        component_count: components,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let mut settings = config::load_settings();
    if let Some(url) = cli.api_base_url {
        settings.api_base_url = url;
    }
    let client = HttpConsoleClient::with_timeout(
        &settings.api_base_url,
        Duration::from_secs(settings.request_timeout_secs),
    )?;
    debug!(base_url = client.base_url(), "console client ready");
    let api: Arc<dyn ConsoleApi> = Arc::new(client);
    let top_n = |requested: Option<u32>| requested.unwrap_or(settings.default_top_n);

    match cli.command {
        Command::Health => {
            let dashboard = DashboardController::new(api);
            dashboard.load().await;
            let view = dashboard.state();
            print!("{}", render::dashboard(&view));
            if let Some(error) = view.error {
                bail!(error);
            }
        }
        Command::List { kind, filter } => {
            let list =
                ResourceListController::new(api, kind).with_list_limit(settings.list_limit);
            list.load().await;
            list.set_filter(filter);
            let view = list.state();
            print!("{}", render::list(&view));
            if let Some(error) = view.error {
                bail!(error);
            }
        }
        Command::Show { kind, id } => {
            let found = api
                .get(kind, RecordId(id))
                .await
                .map_err(|err| anyhow!(err.describe(&format!("failed to fetch {kind}"))))?;
            print!("{}", render::record(kind, &found));
        }
        Command::Create { kind, fields } => {
            let fields = parse_assignments(&fields)?;
            let list =
                ResourceListController::new(api, kind).with_list_limit(settings.list_limit);
            list.open_create();
            match list.submit(fields).await {
                Ok(saved) => {
                    info!(%kind, id = %saved.id, "created");
                    print!("{}", render::record(kind, &saved));
                }
                Err(err) => bail!(session_error(&list).unwrap_or_else(|| err.to_string())),
            }
        }
        Command::Update { kind, id, fields } => {
            let fields = parse_assignments(&fields)?;
            let current = api
                .get(kind, RecordId(id))
                .await
                .map_err(|err| anyhow!(err.describe(&format!("failed to fetch {kind}"))))?;
            let list =
                ResourceListController::new(api, kind).with_list_limit(settings.list_limit);
            list.open_edit(current);
            match list.submit(fields).await {
                Ok(saved) => print!("{}", render::record(kind, &saved)),
                Err(err) => bail!(session_error(&list).unwrap_or_else(|| err.to_string())),
            }
        }
        Command::Delete { kind, id, yes } => {
            if !yes {
                bail!("refusing to delete {kind} #{id} without --yes");
            }
            let list =
                ResourceListController::new(api, kind).with_list_limit(settings.list_limit);
            if list
                .remove(RecordId(id), DeletionConfirmed::affirmed())
                .await
                .is_err()
            {
                let notice = list.state().notice;
                bail!(notice.unwrap_or_else(|| format!("failed to delete {kind}")));
            }
            println!("deleted {kind} #{id}");
        }
        Command::Recommend {
            subject,
            algorithm,
            top_n: requested,
        } => {
            let recommendations = RecommendationController::new(api);
            recommendations
                .fetch_single(SubjectId(subject), algorithm, top_n(requested))
                .await;
            print_recommendations(&recommendations)?;
        }
        Command::Compare {
            subject,
            top_n: requested,
            parallel,
        } => {
            let strategy = if parallel {
                ComparisonStrategy::Parallel
            } else {
                ComparisonStrategy::Combined
            };
            let recommendations = RecommendationController::new(api).with_strategy(strategy);
            recommendations
                .fetch_comparison(SubjectId(subject), top_n(requested))
                .await;
            print_recommendations(&recommendations)?;
        }
        Command::ColdStart {
            subject,
            algorithm,
            top_n: requested,
        } => {
            let recommendations = RecommendationController::new(api);
            recommendations
                .fetch_cold_start(SubjectId(subject), algorithm, top_n(requested))
                .await;
            print_recommendations(&recommendations)?;
        }
        Command::Interact {
            subject,
            venue,
            kind,
            weight,
        } => {
            let recommendations = RecommendationController::new(api);
            let receipt = recommendations
                .record_interaction(&InteractionRequest {
                    subject_id: SubjectId(subject),
                    venue_id: VenueId(venue),
                    interaction_kind: kind,
                    weight,
                })
                .await
                .map_err(|err| anyhow!(err.describe("failed to record interaction")))?;
            print!("{}", render::receipt(&receipt));
        }
        Command::Train {
            algorithm,
            loss,
            no_features,
            variant,
            epochs,
            learning_rate,
            components,
        } => {
            let options = training_options(
                loss,
                no_features,
                variant,
                epochs,
                learning_rate,
                components,
            );
            let training = TrainingController::new(api);
            training.train(algorithm, &options).await;
            let phase = training.phase(algorithm);
            print!("{}", render::training(algorithm, &phase));
            if let TrainingPhase::Failed { message } = phase {
                bail!(message);
            }
        }
    }

    Ok(())
}

fn session_error(list: &ResourceListController) -> Option<String> {
    list.state().session.and_then(|session| session.error)
}

fn print_recommendations(controller: &RecommendationController) -> Result<()> {
    let state = controller.state();
    print!("{}", render::recommendations(&state));
    if let RecommendationPhase::Failed(message) = state.phase {
        bail!(message);
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
