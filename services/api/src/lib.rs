mod cli;
mod demo;
mod infra;
mod routes;
mod score;
mod server;

use pmw_review::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
