/// Minimal Stripe API client
///
/// Thin typed wrapper over the Stripe REST API covering exactly what the
/// billing flows need: hosted-checkout session creation and retrieval,
/// product lookup, and billing-portal sessions. Requests are form-encoded
/// and authenticated with the secret key as a bearer token, per Stripe's
/// API conventions.
///
/// Stripe is the trust boundary here: the checkout reconciler never trusts
/// client-supplied fields and instead re-fetches the completed session from
/// this client, so response types keep optional fields optional and let the
/// caller validate each precondition explicitly.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Default Stripe API base URL
const DEFAULT_API_BASE: &str = "https://api.stripe.com/v1";

/// Error type for Stripe API operations
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// Transport-level failure (connection, TLS, timeout, body decoding)
    #[error("Stripe request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe returned a non-2xx response
    #[error("Stripe API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Stripe's error message
        message: String,
    },
}

/// A field that Stripe returns either as a bare ID or as an expanded object
///
/// Retrieval calls pass `expand[]` parameters to inline related objects;
/// anything not expanded stays a plain ID string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    /// Bare object ID
    Id(String),

    /// Fully expanded object
    Object(T),
}

impl Expandable<Customer> {
    /// Gets the customer ID regardless of expansion
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) => id,
            Expandable::Object(customer) => &customer.id,
        }
    }
}

impl Expandable<Subscription> {
    /// Gets the expanded subscription, if the API call expanded it
    pub fn as_object(&self) -> Option<&Subscription> {
        match self {
            Expandable::Id(_) => None,
            Expandable::Object(subscription) => Some(subscription),
        }
    }
}

impl Expandable<Product> {
    /// Gets the product ID regardless of expansion
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) => id,
            Expandable::Object(product) => &product.id,
        }
    }
}

/// Stripe customer object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Customer ID (cus_...)
    pub id: String,

    /// Customer email, when known
    #[serde(default)]
    pub email: Option<String>,
}

/// Stripe subscription object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription ID (sub_...)
    pub id: String,

    /// Status: "trialing", "active", "canceled", ...
    pub status: String,

    /// Subscription items (the plan being billed)
    pub items: SubscriptionItemList,
}

/// Container for subscription items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionItemList {
    /// The items themselves
    pub data: Vec<SubscriptionItem>,
}

/// A single subscription item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionItem {
    /// The price (and through it, the product) being billed
    pub price: Price,
}

/// Stripe price object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Price {
    /// Price ID (price_...)
    pub id: String,

    /// The product this price belongs to
    pub product: Expandable<Product>,
}

/// Stripe product object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Product ID (prod_...)
    pub id: String,

    /// Display name, used as the team's plan name
    pub name: String,
}

/// Stripe Checkout session object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Session ID (cs_...)
    pub id: String,

    /// Hosted checkout URL (present on creation)
    #[serde(default)]
    pub url: Option<String>,

    /// Correlation value set at creation time (the acting user's ID)
    #[serde(default)]
    pub client_reference_id: Option<String>,

    /// The customer, once checkout completes
    #[serde(default)]
    pub customer: Option<Expandable<Customer>>,

    /// The subscription created by checkout
    #[serde(default)]
    pub subscription: Option<Expandable<Subscription>>,
}

/// Stripe billing-portal session object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalSession {
    /// Portal session ID
    pub id: String,

    /// Hosted portal URL to redirect the customer to
    pub url: String,
}

/// Parameters for creating a hosted-checkout session
#[derive(Debug, Clone)]
pub struct CreateCheckoutSession {
    /// Price the customer is subscribing to
    pub price_id: String,

    /// Correlation value: the acting user's ID, read back by the reconciler
    pub client_reference_id: i64,

    /// Existing Stripe customer, when the team already has one
    pub customer: Option<String>,

    /// URL Stripe redirects to on success; must contain `{CHECKOUT_SESSION_ID}`
    pub success_url: String,

    /// URL Stripe redirects to on cancel
    pub cancel_url: String,

    /// Free trial length in days
    pub trial_period_days: u32,
}

/// Stripe API client
///
/// Cheap to clone; holds a shared `reqwest::Client`. Constructed once at
/// startup and dependency-injected through the application state rather
/// than held as an ambient singleton.
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    /// Creates a new client for the live Stripe API
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self::with_api_base(secret_key, DEFAULT_API_BASE)
    }

    /// Creates a client pointing at a custom API base (used by tests)
    pub fn with_api_base(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.into(),
            api_base: api_base.into(),
        }
    }

    /// Retrieves a completed checkout session with customer and
    /// subscription expanded
    ///
    /// The checkout reconciler starts here: the session is re-fetched from
    /// Stripe rather than trusting anything the redirect carried.
    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let url = format!("{}/checkout/sessions/{}", self.api_base, session_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.secret_key)
            .query(&[("expand[]", "customer"), ("expand[]", "subscription")])
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Creates a hosted-checkout session
    ///
    /// Embeds the acting user's ID as `client_reference_id` so the callback
    /// can be tied back to a local principal.
    pub async fn create_checkout_session(
        &self,
        params: CreateCheckoutSession,
    ) -> Result<CheckoutSession, StripeError> {
        let client_reference_id = params.client_reference_id.to_string();
        let trial_period_days = params.trial_period_days.to_string();

        let mut form: Vec<(&str, &str)> = vec![
            ("mode", "subscription"),
            ("payment_method_types[]", "card"),
            ("line_items[0][price]", params.price_id.as_str()),
            ("line_items[0][quantity]", "1"),
            ("success_url", params.success_url.as_str()),
            ("cancel_url", params.cancel_url.as_str()),
            ("client_reference_id", client_reference_id.as_str()),
            ("subscription_data[trial_period_days]", trial_period_days.as_str()),
            ("allow_promotion_codes", "true"),
        ];

        if let Some(ref customer) = params.customer {
            form.push(("customer", customer.as_str()));
        }

        let url = format!("{}/checkout/sessions", self.api_base);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Retrieves a product (for its display name)
    pub async fn retrieve_product(&self, product_id: &str) -> Result<Product, StripeError> {
        let url = format!("{}/products/{}", self.api_base, product_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Creates a billing-portal session for an existing customer
    pub async fn create_portal_session(
        &self,
        customer: &str,
        return_url: &str,
    ) -> Result<PortalSession, StripeError> {
        let url = format!("{}/billing_portal/sessions", self.api_base);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&[("customer", customer), ("return_url", return_url)])
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Decodes a 2xx response body, or surfaces Stripe's error message
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(StripeError::Api {
                status: status.as_u16(),
                message: extract_api_error_message(status, &response.text().await?),
            })
        }
    }
}

/// Pulls the human-readable message out of a Stripe error body
///
/// Stripe wraps errors as `{"error": {"message": "..."}}`; anything that
/// doesn't parse falls back to the status text.
fn extract_api_error_message(status: StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        message: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error.message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        })
}
