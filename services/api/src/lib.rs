mod cli;
mod demo;
mod infra;
mod routes;
mod scheduler;
mod server;

use clinic_roster::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
