//! Single sign-out support.
//!
//! When a user logs out of CAS, the server POSTs a SAML `LogoutRequest` to
//! every service the user authenticated with. The `SessionIndex` of that
//! request is the service ticket originally used to log in, which lets the
//! application drop the matching session.
use crate::xml;

/// Session ticket carried by a SAML logout request body.
///
/// Malformed or unrelated bodies yield `None`.
pub fn extract_logout_ticket(logout_request: &str) -> Option<String> {
    let session_index = xml::parse_lenient(logout_request, |document| {
        xml::find_descendant(document.root(), "SessionIndex").map(xml::trimmed_text)
    });
    let ticket = match session_index {
        Ok(ticket) => ticket?,
        Err(err) => {
            debug!("Not a valid CAS logout request: {}", err);
            return None;
        }
    };
    match ticket.is_empty() {
        true => None,
        false => Some(ticket),
    }
}

/// Session ticket of a single sign-out callback, if the request is one.
///
/// `logout_request` is the value of the `logoutRequest` form field.
pub fn single_signout_ticket(method: &str, logout_request: Option<&str>) -> Option<String> {
    if !method.eq_ignore_ascii_case("POST") {
        return None;
    }
    let ticket = logout_request.and_then(extract_logout_ticket);
    if let Some(ticket) = &ticket {
        debug!("CAS single sign-out for ticket {}", ticket);
    }
    ticket
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGOUT_REQUEST: &str = "<samlp:LogoutRequest \
        xmlns:samlp=\"urn:oasis:names:tc:SAML:2.0:protocol\" \
        xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\" \
        ID=\"LR-1\" Version=\"2.0\" IssueInstant=\"2020-10-18T10:00:00Z\">
            <saml:NameID>@NOT_USED@</saml:NameID>
            <samlp:SessionIndex>
                ST-1856339-aA5Yuvrxzpv8Tau1cYQ7
            </samlp:SessionIndex>
        </samlp:LogoutRequest>";

    #[test]
    fn should_extract_session_index() {
        assert_eq!(
            extract_logout_ticket(LOGOUT_REQUEST),
            Some(String::from("ST-1856339-aA5Yuvrxzpv8Tau1cYQ7"))
        );
    }

    #[test]
    fn invalid_xml_yields_no_ticket() {
        assert_eq!(extract_logout_ticket("<samlp:LogoutRequest"), None);
        assert_eq!(extract_logout_ticket("not xml at all"), None);
        assert_eq!(extract_logout_ticket(""), None);
    }

    #[test]
    fn missing_or_empty_session_index_yields_no_ticket() {
        assert_eq!(extract_logout_ticket("<LogoutRequest><NameID>x</NameID></LogoutRequest>"), None);
        assert_eq!(
            extract_logout_ticket("<LogoutRequest><SessionIndex> </SessionIndex></LogoutRequest>"),
            None
        );
    }

    #[test]
    fn session_index_without_namespace_declarations() {
        assert_eq!(
            extract_logout_ticket(
                "<samlp:LogoutRequest ID=\"LR-2\"><saml:NameID>@NOT_USED@</saml:NameID>\
                 <samlp:SessionIndex>ST-2-xyz</samlp:SessionIndex></samlp:LogoutRequest>"
            ),
            Some(String::from("ST-2-xyz"))
        );
    }

    #[test]
    fn only_post_requests_are_sign_out_callbacks() {
        assert_eq!(
            single_signout_ticket("POST", Some(LOGOUT_REQUEST)),
            Some(String::from("ST-1856339-aA5Yuvrxzpv8Tau1cYQ7"))
        );
        assert_eq!(single_signout_ticket("GET", Some(LOGOUT_REQUEST)), None);
        assert_eq!(single_signout_ticket("POST", None), None);
        assert_eq!(single_signout_ticket("post", Some("<broken")), None);
    }
}
