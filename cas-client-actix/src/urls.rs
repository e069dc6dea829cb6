use super::{
    redirect_response, service_url_for_request, site_url_for_request, ActixCasClient,
    CAS_USER_SESSION_KEY,
};
use actix_http::error::ErrorInternalServerError;
use actix_session::UserSession;
use actix_web::http;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use cas_client_core::{single_signout_ticket, ValidationResult};
use serde::Deserialize;

/// Body of a CAS single sign-out callback.
#[derive(Debug, Deserialize)]
pub struct SingleSignoutForm {
    #[serde(rename = "logoutRequest")]
    logout_request: String,
}

/// Sends authenticated users to the after login path, everybody else to CAS.
pub async fn login(req: HttpRequest, cas_client: ActixCasClient) -> Result<HttpResponse, Error> {
    debug!("*** CAS LOGIN: {:?} ***", cas_client);
    let session = req.get_session();
    match session.get::<ValidationResult>(CAS_USER_SESSION_KEY)? {
        Some(_) => Ok(HttpResponse::build(http::StatusCode::TEMPORARY_REDIRECT)
            .header(http::header::LOCATION, cas_client.after_login_path())
            .finish()),
        None => {
            let service_url = service_url_for_request(&req).map_err(ErrorInternalServerError)?;
            Ok(redirect_response(&cas_client.login_url(&service_url)))
        }
    }
}

/// Clears the session and logs the user out of CAS.
pub async fn logout(req: HttpRequest, cas_client: ActixCasClient) -> Result<HttpResponse, Error> {
    debug!("*** CAS LOGOUT: {:?} ***", cas_client);
    let session = req.get_session();
    session.purge();
    let logout_url = cas_client.logout_url(&site_url_for_request(&req));
    Ok(redirect_response(&logout_url))
}

/// Single sign-out callback POSTed by the CAS server.
///
/// Always answers 200: the CAS server does not act on the response and a
/// malformed body must not turn into a server error.
pub async fn single_signout(
    req: HttpRequest,
    form: Option<web::Form<SingleSignoutForm>>,
) -> Result<HttpResponse, Error> {
    let logout_request = form.as_ref().map(|f| f.logout_request.as_str());
    match single_signout_ticket(req.method().as_str(), logout_request) {
        Some(ticket) => debug!("CAS session ended for ticket {}", ticket),
        None => debug!("Ignoring request without a CAS logout request"),
    }
    Ok(HttpResponse::Ok().finish())
}

/// Registers the `login`, `logout` and `signout` routes below `auth_service`.
pub fn register(cfg: &mut web::ServiceConfig, auth_service: &str, cas_client: &ActixCasClient) {
    cfg.service(
        web::resource(&format!("{}/logout", auth_service))
            .name("cas_logout")
            .route(web::get().to(logout)),
    );
    cfg.service(
        web::resource(&format!("{}/login", auth_service))
            .name("cas_login")
            .wrap(cas_client.clone())
            .route(web::get().to(login)),
    );
    cfg.service(
        web::resource(&format!("{}/signout", auth_service))
            .name("cas_signout")
            .route(web::post().to(single_signout)),
    );
}
