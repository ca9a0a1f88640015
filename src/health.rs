use crate::gateway::{HealthReport, HealthStatus};

/// Print a health report as a table, one row per probed endpoint.
pub fn print_health(report: &HealthReport) {
    println!(
        "{:<24} {:<8} {:>8}  ERROR",
        "ENDPOINT", "STATUS", "TIME"
    );
    for endpoint in &report.endpoints {
        let status = match endpoint.status {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Error => "error",
        };
        println!(
            "{:<24} {:<8} {:>6}ms  {}",
            endpoint.endpoint,
            status,
            endpoint.response_time_ms,
            endpoint.error.as_deref().unwrap_or("")
        );
    }
    println!();
    println!("Checked at {}", report.timestamp);
}
