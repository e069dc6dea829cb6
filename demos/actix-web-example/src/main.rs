extern crate cas_client;
extern crate dotenv;

use actix_session::{CookieSession, UserSession};
use actix_web::http::StatusCode;
use actix_web::middleware::Logger;
use actix_web::{get, web, App, Error, HttpRequest, HttpResponse, HttpServer};
use cas_client::actix::{urls, ActixCasClient, NoAuthBehavior, CAS_USER_SESSION_KEY};
use cas_client::{CasClient, CasEndpointConfig, ValidationResult};
use dotenv::dotenv;
use std::io;

const AUTH_SERVICE: &str = "/auth/cas";

#[get("/")]
async fn guest(_req: HttpRequest) -> Result<HttpResponse, Error> {
    Ok(HttpResponse::build(StatusCode::OK)
        .content_type("text/html; charset=utf-8")
        .body("
            Welcome <b>Guest</b>!
            <br>
            <br><a href='/auth/cas/login'>Login (to '/auth/cas/login')</a>
            <br><a href='/user'>Login (to '/user')</a>
            <br><a href='/user/attributes'>Login (to '/user/attributes')</a>
        "))
}

fn session_user(req: &HttpRequest) -> Option<ValidationResult> {
    req.get_session()
        .get::<ValidationResult>(CAS_USER_SESSION_KEY)
        .unwrap_or(None)
}

async fn user(req: HttpRequest) -> Result<HttpResponse, Error> {
    let username = match session_user(&req) {
        Some(user) => user.username().to_owned(),
        None => "guest".to_owned(),
    };
    Ok(HttpResponse::build(StatusCode::OK)
        .content_type("text/html; charset=utf-8")
        .body(format!(
            "Welcome <b>{}</b>!
            <br>
            <br>
            <a href='/user/attributes'>Attributes</a>
            <a href='/auth/cas/logout'>Logout</a>",
            username,
        )))
}

async fn attributes(req: HttpRequest) -> Result<HttpResponse, Error> {
    match session_user(&req) {
        Some(user) => Ok(HttpResponse::Ok().json(user.attributes())),
        None => Ok(HttpResponse::NotFound().finish()),
    }
}

#[actix_rt::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let cas_client = init_cas_client()?;

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(CookieSession::signed(&[0; 32]).secure(false))
            .app_data(cas_client.clone())
            .service(guest)
            .service(
                web::scope("/user")
                    .wrap(cas_client.clone())
                    .route("", web::get().to(user))
                    .route("/attributes", web::get().to(attributes)),
            )
            .configure(|cfg| urls::register(cfg, AUTH_SERVICE, &cas_client))
    })
    .bind("localhost:8080")?
    .run()
    .await
}

/// Builds the client from `CAS_URL`, `CAS_VALIDATE_URL`, `CAS_SERVICE_URL`
/// and `CAS_VERIFY_CERTIFICATE`.
fn init_cas_client() -> io::Result<ActixCasClient> {
    let to_io_error = |err: cas_client::CasError| io::Error::new(io::ErrorKind::Other, err);
    let config = CasEndpointConfig::from_env().map_err(to_io_error)?;
    let cas_client = CasClient::new(config).map_err(to_io_error)?;

    let mut actix_cas_client = ActixCasClient::new(cas_client);
    actix_cas_client
        .set_no_auth_behavior(NoAuthBehavior::Authenticate)
        .set_after_login_path("/user");
    Ok(actix_cas_client)
}
