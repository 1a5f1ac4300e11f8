pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::{
    CartService, DeliveryService, NotificationService, OrderService, PaymentService,
    PaymentSettings,
};
use config::Config;
use domain::ports::UserDirectory;
use infrastructure::{
    AfricasTalkingSms, BroadcastHub, DarajaClient, DieselCartRepository, DieselCatalog,
    DieselDeliveryRepository, DieselNotificationRepository, DieselOrderRepository,
    DieselPaymentRepository,
};

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::cart::view_cart,
        handlers::cart::add_item,
        handlers::cart::set_quantity,
        handlers::cart::remove_item,
        handlers::cart::clear_cart,
        handlers::orders::place_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::update_order_status,
        handlers::payments::initiate_payment,
        handlers::payments::payment_callback,
        handlers::deliveries::assign_delivery,
        handlers::deliveries::list_deliveries,
        handlers::deliveries::update_delivery_status,
        handlers::notifications::list_notifications,
        handlers::notifications::notification_stream,
    ),
    components(schemas(
        handlers::cart::AddItemRequest,
        handlers::cart::SetQuantityRequest,
        handlers::cart::CartResponse,
        handlers::orders::OrderResponse,
        handlers::orders::UpdateOrderStatusRequest,
        handlers::payments::InitiatePaymentRequest,
        handlers::payments::PaymentMessageResponse,
        handlers::payments::StkCallbackRequest,
        handlers::deliveries::AssignDeliveryRequest,
        handlers::deliveries::UpdateDeliveryStatusRequest,
        handlers::deliveries::DeliveryResponse,
        handlers::notifications::NotificationResponse,
    )),
    tags(
        (name = "cart", description = "Customer shopping cart"),
        (name = "orders", description = "Order ledger"),
        (name = "payments", description = "M-Pesa STK push and callback"),
        (name = "deliveries", description = "Courier assignment and tracking"),
        (name = "notifications", description = "SMS and in-app notification log"),
    )
)]
pub struct ApiDoc;

/// Everything the HTTP layer needs, wired against Postgres and the live
/// providers.
pub struct Services {
    pub carts: CartService,
    pub orders: OrderService,
    pub payments: PaymentService,
    pub deliveries: DeliveryService,
    pub notifications: Arc<NotificationService>,
    pub users: Arc<dyn UserDirectory>,
    pub hub: Arc<BroadcastHub>,
}

impl Services {
    pub fn build(pool: DbPool, config: &Config) -> Self {
        let http = reqwest::Client::new();
        let catalog = Arc::new(DieselCatalog::new(pool.clone()));
        let orders = Arc::new(DieselOrderRepository::new(pool.clone()));
        let hub = Arc::new(BroadcastHub::new());

        let notifications = Arc::new(NotificationService::new(
            Arc::new(DieselNotificationRepository::new(pool.clone())),
            catalog.clone(),
            Arc::new(AfricasTalkingSms::new(http.clone(), config.sms.clone())),
            hub.clone(),
            config.outbound_timeout,
        ));

        Services {
            carts: CartService::new(
                Arc::new(DieselCartRepository::new(pool.clone())),
                catalog.clone(),
            ),
            orders: OrderService::new(orders.clone(), notifications.clone()),
            payments: PaymentService::new(
                orders.clone(),
                Arc::new(DieselPaymentRepository::new(pool.clone())),
                Arc::new(DarajaClient::new(http, config.mpesa.clone())),
                notifications.clone(),
                PaymentSettings {
                    callback_base_url: config.callback_base_url.clone(),
                    callback_token: config.callback_token.clone(),
                    timeout: config.outbound_timeout,
                },
            ),
            deliveries: DeliveryService::new(
                orders,
                Arc::new(DieselDeliveryRepository::new(pool)),
                catalog.clone(),
                notifications.clone(),
            ),
            notifications,
            users: catalog,
            hub,
        }
    }
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    services: Services,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let carts = web::Data::new(services.carts);
    let orders = web::Data::new(services.orders);
    let payments = web::Data::new(services.payments);
    let deliveries = web::Data::new(services.deliveries);
    let notifications = web::Data::from(services.notifications);
    let users: web::Data<dyn UserDirectory> = web::Data::from(services.users);
    let hub = web::Data::from(services.hub);
    let openapi = ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(carts.clone())
            .app_data(orders.clone())
            .app_data(payments.clone())
            .app_data(deliveries.clone())
            .app_data(notifications.clone())
            .app_data(users.clone())
            .app_data(hub.clone())
            .app_data(web::JsonConfig::default().error_handler(handlers::json_error_handler))
            .wrap(Logger::default())
            .service(
                web::scope("/cart")
                    .route("", web::get().to(handlers::cart::view_cart))
                    .route("", web::delete().to(handlers::cart::clear_cart))
                    .route("/items", web::post().to(handlers::cart::add_item))
                    .route(
                        "/items/{product_id}",
                        web::put().to(handlers::cart::set_quantity),
                    )
                    .route(
                        "/items/{product_id}",
                        web::delete().to(handlers::cart::remove_item),
                    ),
            )
            .service(
                web::scope("/orders")
                    .route("", web::post().to(handlers::orders::place_order))
                    .route("", web::get().to(handlers::orders::list_orders))
                    .route("/{id}", web::get().to(handlers::orders::get_order))
                    .route(
                        "/{id}/status",
                        web::patch().to(handlers::orders::update_order_status),
                    ),
            )
            .service(
                web::scope("/payments")
                    .route(
                        "/initiate",
                        web::post().to(handlers::payments::initiate_payment),
                    )
                    .route(
                        "/callback/{payment_id}",
                        web::post().to(handlers::payments::payment_callback),
                    ),
            )
            .service(
                web::scope("/deliveries")
                    .route("", web::get().to(handlers::deliveries::list_deliveries))
                    .route(
                        "/assign",
                        web::post().to(handlers::deliveries::assign_delivery),
                    )
                    .route(
                        "/{id}/status",
                        web::patch().to(handlers::deliveries::update_delivery_status),
                    ),
            )
            .service(
                web::scope("/notifications")
                    .route(
                        "",
                        web::get().to(handlers::notifications::list_notifications),
                    )
                    .route(
                        "/stream",
                        web::get().to(handlers::notifications::notification_stream),
                    ),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
