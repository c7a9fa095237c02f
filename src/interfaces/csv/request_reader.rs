use crate::application::gateway::{PayinRequest, PayoutRequest, TaxPaymentRequest};
use crate::domain::audit::RequestContext;
use crate::domain::transaction::Metadata;
use crate::domain::wallet::UserId;
use crate::error::{GatewayError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum RequestOp {
    Payin,
    Payout,
    Tax,
    Suspend,
    Activate,
}

/// One CSV row: `op, user, amount, detail`.
///
/// `detail` is the source account for pay-ins, the destination account for
/// payouts and the tax type for tax payments.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct RequestRecord {
    pub op: RequestOp,
    pub user: String,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Clone)]
pub enum GatewayRequest {
    Payin(PayinRequest),
    Payout(PayoutRequest),
    Tax(TaxPaymentRequest),
    Suspend(UserId),
    Activate(UserId),
}

impl GatewayRequest {
    /// The user the request acts on.
    pub fn user_id(&self) -> &UserId {
        match self {
            GatewayRequest::Payin(r) => &r.user_id,
            GatewayRequest::Payout(r) => &r.user_id,
            GatewayRequest::Tax(r) => &r.user_id,
            GatewayRequest::Suspend(user_id) | GatewayRequest::Activate(user_id) => user_id,
        }
    }
}

impl TryFrom<RequestRecord> for GatewayRequest {
    type Error = GatewayError;

    fn try_from(record: RequestRecord) -> Result<Self> {
        if record.user.is_empty() {
            return Err(GatewayError::Validation("user is required".to_string()));
        }
        let user_id = UserId::new(record.user);
        let detail = record.detail.filter(|d| !d.is_empty());
        let amount = || {
            record.amount.ok_or_else(|| {
                GatewayError::Validation(format!("{:?} request needs an amount", record.op))
            })
        };

        let request = match record.op {
            RequestOp::Payin => GatewayRequest::Payin(PayinRequest {
                user_id,
                amount: amount()?,
                from_account: detail,
                metadata: Metadata::new(),
                context: RequestContext::default(),
            }),
            RequestOp::Payout => GatewayRequest::Payout(PayoutRequest {
                user_id,
                amount: amount()?,
                to_account: detail,
                metadata: Metadata::new(),
                context: RequestContext::default(),
            }),
            RequestOp::Tax => GatewayRequest::Tax(TaxPaymentRequest {
                user_id,
                amount: amount()?,
                tax_type: detail,
                metadata: Metadata::new(),
                context: RequestContext::default(),
            }),
            RequestOp::Suspend => GatewayRequest::Suspend(user_id),
            RequestOp::Activate => GatewayRequest::Activate(user_id),
        };
        Ok(request)
    }
}

/// Reads gateway requests from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// so the trailing `detail` column may be left out.
pub struct RequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RequestReader<R> {
    /// Creates a new `RequestReader`.
    ///
    /// # Arguments
    ///
    /// * `source` - Any reader yielding CSV with an `op, user, amount, detail` header.
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes and validates each row.
    pub fn requests(self) -> impl Iterator<Item = Result<GatewayRequest>> {
        self.reader
            .into_deserialize::<RequestRecord>()
            .map(|result| result.map_err(GatewayError::from).and_then(GatewayRequest::try_from))
    }
}
