//! # Accrual client adapter
//!
//! Translates one order number into one request to the external accrual service, and normalises the response into an
//! [`AccrualOutcome`].
//!
//! The accrual service answers `GET {base}/api/orders/{number}` with
//! * `200` and a JSON body `{ "order": "...", "status": "REGISTERED|PROCESSING|INVALID|PROCESSED", "accrual": 500 }`,
//! * `204` if it has never heard of the order,
//! * `429` if we are polling too fast,
//! * anything else when it is having a bad day.
mod client;
mod response;

pub use client::{AccrualClient, AccrualClientError, HttpAccrualClient};
pub use response::{interpret_response, AccrualOutcome, AccrualResponse, AccrualStatus};
