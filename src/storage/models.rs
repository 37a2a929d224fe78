//! Input records for the attribution store

/// Fields for a new Click; the token comes from the token generator and the
/// rest from the inbound tracking request.
#[derive(Debug, Clone)]
pub struct NewClick {
    pub ref_token: String,
    pub src: String,
    pub platform_click_id: Option<String>,
    pub utm_source: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_adset: Option<String>,
    pub utm_ad: Option<String>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

/// Fields for a Lead upsert. `click_id` is None for channel events that
/// cannot be joined back to a Click (messaging fallback identity).
#[derive(Debug, Clone)]
pub struct NewLead {
    pub click_id: Option<i64>,
    pub ref_token: String,
    pub channel: String,
    pub external_user_id: Option<String>,
    pub raw: Option<String>,
}
