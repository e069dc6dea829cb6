#[macro_use]
extern crate log;
extern crate cas_client_core;

pub mod urls;

use cas_client_core::{current_service_url, redirect_body, CasClient, CasError, ValidationResult};

use actix_http::error::ErrorInternalServerError;
use actix_service::{Service, Transform};
use actix_session::{Session, UserSession};
use actix_web::dev::{Payload, ServiceRequest, ServiceResponse};
use actix_web::web;
use actix_web::{http, Error, FromRequest, HttpRequest, HttpResponse};
use futures::future::{err, ok, FutureExt, LocalBoxFuture, Ready};

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::task::{Context, Poll};

/// Session key under which the [`ValidationResult`] is stored.
pub const CAS_USER_SESSION_KEY: &str = "cas_user";

/// What the middleware does with a request that has no authenticated user.
///
/// - Authenticate: validates the `ticket` parameter or redirects to CAS login
/// - AuthenticatedOr403: answers 403 (or redirects to the configured url)
/// - AuthenticatedOr404: answers 404 (or redirects to the configured url)
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NoAuthBehavior {
    AuthenticatedOr403,
    AuthenticatedOr404,
    Authenticate,
}

#[derive(Clone, Debug)]
pub struct ActixCasClient {
    cas_client: CasClient,
    no_auth_behavior: NoAuthBehavior,
    after_login_path: String,
    url_to_403: Option<String>,
    url_to_404: Option<String>,
}

impl ActixCasClient {
    pub fn new(cas_client: CasClient) -> Self {
        ActixCasClient {
            cas_client,
            no_auth_behavior: NoAuthBehavior::Authenticate,
            after_login_path: String::from("/"),
            url_to_403: None,
            url_to_404: None,
        }
    }

    // Getters / Setters
    pub fn cas_client(&self) -> &CasClient {
        &self.cas_client
    }

    pub fn no_auth_behavior(&self) -> NoAuthBehavior {
        self.no_auth_behavior
    }

    pub fn set_no_auth_behavior(&mut self, no_auth_behavior: NoAuthBehavior) -> &mut Self {
        self.no_auth_behavior = no_auth_behavior;
        self
    }

    pub fn after_login_path(&self) -> &str {
        &self.after_login_path
    }

    pub fn set_after_login_path(&mut self, after_login_path: &str) -> &mut Self {
        if after_login_path.is_empty() {
            error!("After login path cannot be empty");
        } else {
            self.after_login_path = after_login_path.to_string();
        }
        self
    }

    pub fn set_url_to_403(&mut self, url: Option<String>) -> &mut Self {
        self.url_to_403 = url;
        self
    }

    pub fn set_url_to_404(&mut self, url: Option<String>) -> &mut Self {
        self.url_to_404 = url;
        self
    }

    pub fn login_url(&self, service_url: &str) -> String {
        self.cas_client.login_url(service_url)
    }

    pub fn logout_url(&self, return_url: &str) -> String {
        self.cas_client.logout_url(return_url)
    }

    /// Response for a request without an authenticated user, `None` to let
    /// the request through.
    async fn no_auth_response(&self, req_info: &RequestCasInfo) -> Option<HttpResponse> {
        if req_info.cas_user.is_some() {
            return None;
        }
        match self.no_auth_behavior {
            NoAuthBehavior::Authenticate => self.authenticate_user(req_info).await,
            NoAuthBehavior::AuthenticatedOr403 => Some(error_response(
                http::StatusCode::FORBIDDEN,
                self.url_to_403.as_deref(),
            )),
            NoAuthBehavior::AuthenticatedOr404 => Some(error_response(
                http::StatusCode::NOT_FOUND,
                self.url_to_404.as_deref(),
            )),
        }
    }

    async fn authenticate_user(&self, req_info: &RequestCasInfo) -> Option<HttpResponse> {
        match &req_info.ticket {
            Some(ticket) => {
                debug!("Ticket = {}!", ticket);
                self.handle_ticket(req_info, ticket).await
            }
            None => {
                info!("Ticket not found!");
                Some(redirect_response(&self.login_url(&req_info.service_url)))
            }
        }
    }

    async fn handle_ticket(&self, req_info: &RequestCasInfo, ticket: &str) -> Option<HttpResponse> {
        match self
            .cas_client
            .validate(ticket, Some(req_info.service_url.as_str()))
            .await
        {
            Ok(result) => {
                if let Err(err) = req_info.session.set(CAS_USER_SESSION_KEY, result) {
                    error!("Error while saving cas_user in session! Error: {}", err);
                    return Some(HttpResponse::InternalServerError().finish());
                }
                None
            }
            Err(err) if err.is_validation() => {
                warn!("{}", err);
                Some(redirect_response(&self.login_url(&req_info.service_url)))
            }
            Err(err) => {
                error!("Error while validating CAS ticket! Error: {}", err);
                Some(HttpResponse::InternalServerError().body(err.to_string()))
            }
        }
    }
}

/// Enable ActixCasClient to be used in Actix "extractors".
///
impl FromRequest for ActixCasClient {
    type Config = ();
    type Error = Error;
    type Future = Ready<Result<Self, Error>>;

    /// Extract the ActixCasClient from the request data. Typically, this
    /// is added using the `.app_data` method of actix_web::App. e.g.
    /// `App::new().wrap(cookie_store).app_data(your_actix_cas_client.clone())`
    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.app_data::<ActixCasClient>() {
            Some(client) => ok(client.clone()),
            _ => {
                debug!(
                    "Failed find ActixCasClient. \
                     Request path: {:?}",
                    req.path()
                );
                err(ErrorInternalServerError(
                    "App data is not configured with ActixCasClient. See documentation.",
                ))
            }
        }
    }
}

impl<S, B> Transform<S> for ActixCasClient
where
    S: Service<Request = ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Request = ServiceRequest;
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ActixCasClientMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ActixCasClientMiddleware {
            service: Rc::new(RefCell::new(service)),
            client: self.clone(),
        })
    }
}

pub struct ActixCasClientMiddleware<S> {
    service: Rc<RefCell<S>>,
    client: ActixCasClient,
}

impl<S, B> Service for ActixCasClientMiddleware<S>
where
    S: Service<Request = ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Request = ServiceRequest;
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context) -> Poll<Result<(), Self::Error>> {
        self.service.borrow_mut().poll_ready(cx)
    }

    fn call(&mut self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let client = self.client.clone();
        async move {
            debug!("*** BEGIN CAS CLIENT MIDDLEWARE ***");
            let resp = match RequestCasInfo::from_service_request(&req) {
                Ok(req_info) => client.no_auth_response(&req_info).await,
                Err(err) => {
                    error!("Cannot read CAS information from request! Error: {}", err);
                    Some(HttpResponse::BadRequest().finish())
                }
            };
            match resp {
                Some(resp) => {
                    debug!("*** CAS CLIENT MIDDLEWARE RESPONSE: INTERCEPT REQUEST ***");
                    Ok(req.into_response(resp.into_body()))
                }
                None => {
                    debug!("*** CAS CLIENT MIDDLEWARE RESPONSE: CONTINUE ***");
                    let fut = service.borrow_mut().call(req);
                    fut.await
                }
            }
        }
        .boxed_local()
    }
}

/// CAS related state of an incoming request.
struct RequestCasInfo {
    session: Session,
    ticket: Option<String>,
    cas_user: Option<ValidationResult>,
    service_url: String,
}

impl RequestCasInfo {
    fn from_service_request(req: &ServiceRequest) -> Result<Self, Error> {
        let session = req.get_session();
        let cas_user = session.get::<ValidationResult>(CAS_USER_SESSION_KEY)?;
        let ticket = ticket_for_query_string(req.query_string())?;
        let service_url = service_url_for_request(req.request()).map_err(ErrorInternalServerError)?;
        Ok(RequestCasInfo {
            session,
            ticket,
            cas_user,
            service_url,
        })
    }
}

fn ticket_for_query_string(query_string: &str) -> Result<Option<String>, Error> {
    let params = web::Query::<HashMap<String, String>>::from_query(query_string)?;
    Ok(params.get("ticket").filter(|t| !t.is_empty()).cloned())
}

/// Url of the current page without its `ticket` parameter.
pub fn service_url_for_request(req: &HttpRequest) -> Result<String, CasError> {
    let connection_info = req.connection_info();
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    current_service_url(connection_info.scheme(), connection_info.host(), path_and_query)
}

/// `scheme://host/` of the current request.
pub fn site_url_for_request(req: &HttpRequest) -> String {
    let connection_info = req.connection_info();
    format!("{}://{}/", connection_info.scheme(), connection_info.host())
}

/// 307 to `location` with a fallback link in the body.
pub fn redirect_response(location: &str) -> HttpResponse {
    HttpResponse::build(http::StatusCode::TEMPORARY_REDIRECT)
        .header(http::header::LOCATION, location)
        .content_type("text/html; charset=utf-8")
        .body(redirect_body(location))
}

fn error_response(status_code: http::StatusCode, error_url: Option<&str>) -> HttpResponse {
    match error_url {
        Some(url) => HttpResponse::build(http::StatusCode::TEMPORARY_REDIRECT)
            .header(http::header::LOCATION, url)
            .finish(),
        None => HttpResponse::build(status_code).finish(),
    }
}
