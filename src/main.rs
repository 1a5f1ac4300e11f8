use campus_marketplace::config::Config;
use campus_marketplace::{build_server, create_pool, run_migrations, Services};
use dotenvy::dotenv;
use std::io;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let pool = create_pool(&config.database_url).map_err(io::Error::other)?;
    run_migrations(&pool).map_err(io::Error::other)?;

    if config.callback_token.is_none() {
        log::warn!("MPESA_CALLBACK_TOKEN is not set; payment callbacks are unauthenticated");
    }
    log::info!("Starting server at http://{}:{}", config.host, config.port);

    let services = Services::build(pool, &config);
    build_server(services, &config.host, config.port)?.await
}
