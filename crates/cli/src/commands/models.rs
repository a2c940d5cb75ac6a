//! Model artifact and server health commands

use advisor_lib::{predictor::ModelSummary, HealthResponse};
use anyhow::Result;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, print_json, print_table, print_warning, OutputFormat};

/// Row for the models table
#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "Task")]
    task: String,
    #[tabled(rename = "Loaded")]
    loaded: String,
    #[tabled(rename = "Created")]
    created_at: String,
    #[tabled(rename = "Train/Test")]
    rows: String,
    #[tabled(rename = "Metrics")]
    metrics: String,
    #[tabled(rename = "Checksum")]
    checksum: String,
    #[tabled(rename = "Path")]
    path: String,
}

/// Row for the health table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

fn model_row(summary: &ModelSummary) -> ModelRow {
    let loaded = color_status(&summary.loaded.to_string());
    match &summary.header {
        Some(header) => ModelRow {
            task: summary.task.to_string(),
            loaded,
            created_at: header
                .metadata
                .created_at
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            rows: format!(
                "{}/{}",
                header.metadata.train_rows, header.metadata.test_rows
            ),
            metrics: header
                .metadata
                .metrics
                .pairs()
                .iter()
                .map(|(name, value)| format!("{}={:.4}", name, value))
                .collect::<Vec<_>>()
                .join("\n"),
            checksum: truncate_checksum(&header.checksum),
            path: summary.path.clone(),
        },
        None => ModelRow {
            task: summary.task.to_string(),
            loaded,
            created_at: "-".to_string(),
            rows: "-".to_string(),
            metrics: summary.error.clone().unwrap_or_else(|| "-".to_string()),
            checksum: "-".to_string(),
            path: summary.path.clone(),
        },
    }
}

/// Truncate a checksum for display
fn truncate_checksum(checksum: &str) -> String {
    if checksum.len() > 12 {
        format!("{}...", &checksum[..12])
    } else {
        checksum.to_string()
    }
}

/// List both pipeline artifacts as the server sees them
pub async fn list_models(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let models: Vec<ModelSummary> = client.get("api/v1/models").await?;

    match format {
        OutputFormat::Json => print_json(&models)?,
        OutputFormat::Table => {
            let missing = models.iter().filter(|m| m.header.is_none()).count();
            print_table(models.iter().map(model_row).collect(), "No models reported");
            if missing > 0 {
                print_warning("Train the missing pipelines with `advisor train all`");
            }
        }
    }

    Ok(())
}

/// Show server health, including degraded or unhealthy components
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let (_, health): (_, HealthResponse) = client.get_status("healthz").await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            let status = serde_json::to_value(health.status)?;
            let status = status.as_str().unwrap_or_default().to_string();
            println!("Overall: {}", color_status(&status));

            let rows = health
                .components
                .into_iter()
                .map(|(name, component)| {
                    let status = serde_json::to_value(component.status)
                        .ok()
                        .and_then(|v| v.as_str().map(str::to_string))
                        .unwrap_or_default();
                    ComponentRow {
                        name: name.to_string(),
                        status: color_status(&status),
                        message: component.message.unwrap_or_default(),
                    }
                })
                .collect();
            print_table(rows, "No components registered");
        }
    }

    Ok(())
}
