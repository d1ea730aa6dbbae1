use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use forwarded_header_value::ForwardedHeaderValue;
use tracing::{debug, error};

use crate::http_err::ApiError;

/// The IP address a request originated from.
///
/// When the server sits behind a reverse proxy, the peer address of the
/// connection is the proxy, not the client, so the `X-Forwarded-For` header
/// takes precedence over the connection info when it is present and parses.
pub struct ClientIp(pub IpAddr);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(header) = parts.headers.get("x-forwarded-for") {
            let forwarded = header
                .to_str()
                .ok()
                .and_then(|value| ForwardedHeaderValue::from_x_forwarded_for(value).ok());

            match forwarded.and_then(|value| {
                value
                    .remotest()
                    .forwarded_for
                    .as_ref()
                    .and_then(|identifier| identifier.ip())
            }) {
                Some(ip) => return Ok(Self(ip)),
                None => {
                    debug!(
                        ?header,
                        "Could not extract an IP address from the forwarding header."
                    );
                }
            }
        }

        match parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            Some(ConnectInfo(addr)) => Ok(Self(addr.ip())),
            None => {
                error!("No connection info is available to determine the client IP.");

                Err(ApiError::InternalServerError)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> Result<ClientIp, ApiError> {
        let (mut parts, _) = request.into_parts();

        ClientIp::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn forwarding_header_takes_precedence() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .extension(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 443))))
            .body(())
            .unwrap();

        let ClientIp(ip) = extract(request).await.unwrap();

        assert_eq!("203.0.113.7".parse::<IpAddr>().unwrap(), ip);
    }

    #[tokio::test]
    async fn falls_back_to_connection_address() {
        let request = Request::builder()
            .extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 8000))))
            .body(())
            .unwrap();

        let ClientIp(ip) = extract(request).await.unwrap();

        assert_eq!("127.0.0.1".parse::<IpAddr>().unwrap(), ip);
    }

    #[tokio::test]
    async fn unparseable_header_falls_back_to_connection_address() {
        let request = Request::builder()
            .header("x-forwarded-for", "not-an-address")
            .extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 8000))))
            .body(())
            .unwrap();

        let ClientIp(ip) = extract(request).await.unwrap();

        assert_eq!("127.0.0.1".parse::<IpAddr>().unwrap(), ip);
    }
}
