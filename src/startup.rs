use crate::authentication::AdminApiKey;
use crate::configuration::Settings;
use crate::domain::EmailAddress;
use crate::email_client::EmailClient;
use crate::feed::FeedProxy;
use crate::rate_limit::RouteRateLimiters;
use crate::routes::{admin, contact, fetch_feed, health_check, subscribe};
use crate::storage::{Store, build_store};
use crate::utils::e400;
use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::http::header;
use actix_web::web::Data;
use actix_web::{App, HttpServer, web};
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

pub struct Application {
    port: u16,
    server: Server,
    store: Arc<dyn Store>,
}

impl Application {
    pub async fn build(configuration: Settings) -> Result<Self, anyhow::Error> {
        let address = configuration.address();
        let store = build_store(configuration.storage).await?;
        let admin_email = configuration.email_client.admin_email.clone();
        let email_client = configuration.email_client.client()?;
        let feed_proxy = FeedProxy::new(
            configuration.feed.cache_ttl(),
            configuration.feed.cache_max_capacity,
            configuration.feed.timeout(),
        )?;
        let rate_limiters = RouteRateLimiters {
            subscribe: configuration.rate_limit.subscribe.limiter(),
            contact: configuration.rate_limit.contact.limiter(),
        };

        let listener = TcpListener::bind(&address)?;
        let port = listener.local_addr()?.port();
        tracing::info!(%address, port, "Listening");
        let server = run(
            listener,
            store.clone(),
            email_client,
            admin_email,
            feed_proxy,
            rate_limiters,
            AdminApiKey(configuration.application.admin_api_key),
        )?;

        Ok(Self {
            port,
            server,
            store,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serves until the server stops, then releases the store.
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        let outcome = self.server.await;
        self.store.close().await;
        outcome
    }
}

#[allow(clippy::too_many_arguments)]
fn run(
    listener: TcpListener,
    store: Arc<dyn Store>,
    email_client: EmailClient,
    admin_email: EmailAddress,
    feed_proxy: FeedProxy,
    rate_limiters: RouteRateLimiters,
    admin_api_key: AdminApiKey,
) -> Result<Server, anyhow::Error> {
    let store: Data<dyn Store> = Data::from(store);
    let email_client = Data::new(email_client);
    let admin_email = Data::new(AdminNotificationEmail(admin_email));
    let feed_proxy = Data::new(feed_proxy);
    let rate_limiters = Data::new(rate_limiters);
    let admin_api_key = Data::new(admin_api_key);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .send_wildcard()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                header::ORIGIN,
                header::HeaderName::from_static("x-requested-with"),
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::AUTHORIZATION,
            ])
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(TracingLogger::default())
            .app_data(web::JsonConfig::default().error_handler(|err, _| e400(err)))
            .app_data(web::QueryConfig::default().error_handler(|err, _| e400(err)))
            .service(health_check::get)
            .service(fetch_feed::get)
            .service(subscribe::post)
            .service(contact::post)
            .service(admin::subscribers::get)
            .service(admin::messages::get)
            .app_data(store.clone())
            .app_data(email_client.clone())
            .app_data(admin_email.clone())
            .app_data(feed_proxy.clone())
            .app_data(rate_limiters.clone())
            .app_data(admin_api_key.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub struct AdminNotificationEmail(pub EmailAddress);
