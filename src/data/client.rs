//! HTTP adapter for the TWSE and TPEx daily close endpoints.

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::config::Settings;
use crate::data::source::{FetchError, FetchOutcome, PriceSource};
use crate::domain::{Exchange, RawSourceResponse};
use crate::error::AppError;

/// Blocking client bound to one exchange endpoint.
pub struct ExchangeClient {
    exchange: Exchange,
    url: String,
    client: Client,
}

impl ExchangeClient {
    pub fn new(exchange: Exchange, settings: &Settings) -> Result<Self, AppError> {
        // Both exchanges reject requests without a browser-like User-Agent.
        let client = Client::builder()
            .timeout(settings.fetch_timeout)
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            exchange,
            url: settings.endpoint(exchange).to_string(),
            client,
        })
    }
}

impl PriceSource for ExchangeClient {
    fn exchange(&self) -> Exchange {
        self.exchange
    }

    fn fetch(&self, date: NaiveDate) -> FetchOutcome {
        log::info!("Fetching {} closes for {date} from {}", self.exchange, self.url);

        let resp = match self
            .client
            .get(&self.url)
            .query(&self.exchange.query(date))
            .send()
        {
            Ok(resp) => resp,
            Err(e) => return FetchOutcome::Failed(classify_transport_error(e)),
        };

        let status = resp.status().as_u16();
        let body = match resp.text() {
            Ok(body) => body,
            Err(e) => return FetchOutcome::Failed(classify_transport_error(e)),
        };

        interpret_response(self.exchange, status, &body)
    }
}

/// Decide what an exchange answer means, independent of the transport.
pub fn interpret_response(exchange: Exchange, status: u16, body: &str) -> FetchOutcome {
    if status != 200 {
        return FetchOutcome::Failed(FetchError::Status { status });
    }

    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            return FetchOutcome::Failed(FetchError::Malformed(format!("body is not JSON: {e}")));
        }
    };

    let Value::Object(mut object) = value else {
        return FetchOutcome::Failed(FetchError::Malformed("body is not a JSON object".to_string()));
    };

    let field = exchange.rows_field();
    match object.remove(field) {
        None | Some(Value::Null) => FetchOutcome::Empty,
        Some(Value::Array(rows)) if rows.is_empty() => FetchOutcome::Empty,
        Some(Value::Array(rows)) => FetchOutcome::Rows(RawSourceResponse { exchange, rows }),
        Some(_) => FetchOutcome::Failed(FetchError::Malformed(format!("`{field}` is not an array"))),
    }
}

fn classify_transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(e.to_string())
    } else {
        FetchError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twse_rows_are_returned_from_data_field() {
        let body = r#"{"stat":"OK","data":[["2890","Test CB","101.50","1.20","1.2%","500"]]}"#;
        match interpret_response(Exchange::Twse, 200, body) {
            FetchOutcome::Rows(raw) => {
                assert_eq!(raw.exchange, Exchange::Twse);
                assert_eq!(raw.rows.len(), 1);
            }
            other => panic!("expected rows, got {other:?}"),
        }
    }

    #[test]
    fn tpex_rows_are_returned_from_aadata_field() {
        let body = r#"{"iTotalRecords":1,"aaData":[["35031","國巨轉一","110.00","0.50","0.46%","12"]]}"#;
        match interpret_response(Exchange::Tpex, 200, body) {
            FetchOutcome::Rows(raw) => assert_eq!(raw.rows.len(), 1),
            other => panic!("expected rows, got {other:?}"),
        }
    }

    #[test]
    fn missing_or_empty_rows_field_is_empty_not_failure() {
        let holiday = r#"{"stat":"很抱歉，沒有符合條件的資料!"}"#;
        assert!(matches!(interpret_response(Exchange::Twse, 200, holiday), FetchOutcome::Empty));

        let empty = r#"{"aaData":[]}"#;
        assert!(matches!(interpret_response(Exchange::Tpex, 200, empty), FetchOutcome::Empty));

        let null = r#"{"data":null}"#;
        assert!(matches!(interpret_response(Exchange::Twse, 200, null), FetchOutcome::Empty));
    }

    #[test]
    fn rows_field_of_the_other_exchange_is_ignored() {
        let body = r#"{"data":[["2890","Test CB","101.50","1.20","1.2%","500"]]}"#;
        assert!(matches!(interpret_response(Exchange::Tpex, 200, body), FetchOutcome::Empty));
    }

    #[test]
    fn non_200_is_a_failure() {
        match interpret_response(Exchange::Twse, 503, "Service Unavailable") {
            FetchOutcome::Failed(FetchError::Status { status }) => assert_eq!(status, 503),
            other => panic!("expected status failure, got {other:?}"),
        }
    }

    #[test]
    fn malformed_bodies_are_failures() {
        for body in ["<html>blocked</html>", "[1,2,3]", r#"{"data":"nope"}"#] {
            assert!(
                matches!(
                    interpret_response(Exchange::Twse, 200, body),
                    FetchOutcome::Failed(FetchError::Malformed(_))
                ),
                "body {body:?} should be malformed"
            );
        }
    }
}
