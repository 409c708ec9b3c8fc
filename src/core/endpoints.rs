//! Static path table for the exchange API.
//!
//! All paths are relative to the client's base URL. Per-security endpoints take the
//! security id appended as a final path segment.

/// Market indices that have an intraday graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Nepse,
    Sensitive,
    Float,
    SensitiveFloat,
    Banking,
    DevelopmentBank,
    Finance,
    HotelTourism,
    Hydro,
    Investment,
    LifeInsurance,
    Manufacturing,
    Microfinance,
    MutualFund,
    NonLifeInsurance,
    Others,
    Trading,
}

impl IndexKind {
    /// Numeric id the exchange uses for this index.
    pub fn id(self) -> u32 {
        match self {
            IndexKind::Nepse => 58,
            IndexKind::Sensitive => 57,
            IndexKind::Float => 62,
            IndexKind::SensitiveFloat => 63,
            IndexKind::Banking => 51,
            IndexKind::DevelopmentBank => 55,
            IndexKind::Finance => 60,
            IndexKind::HotelTourism => 52,
            IndexKind::Hydro => 54,
            IndexKind::Investment => 67,
            IndexKind::LifeInsurance => 65,
            IndexKind::Manufacturing => 56,
            IndexKind::Microfinance => 64,
            IndexKind::MutualFund => 66,
            IndexKind::NonLifeInsurance => 59,
            IndexKind::Others => 53,
            IndexKind::Trading => 61,
        }
    }
}

/// Endpoint paths. Override individual fields if the exchange moves one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub market_summary: String,
    pub market_open: String,
    pub nepse_index: String,
    pub live_market: String,
    pub supply_demand: String,
    pub top_gainers: String,
    pub top_losers: String,
    pub top_ten_trade: String,
    pub top_ten_transaction: String,
    pub top_ten_turnover: String,
    pub todays_price: String,
    pub price_volume: String,
    pub company_list: String,
    pub security_list: String,
    pub floor_sheet: String,
    /// Base for index graphs; the index id is appended.
    pub index_graph: String,
    pub company_daily_graph: String,
    pub company_details: String,
    pub company_price_volume_history: String,
    pub company_floorsheet: String,
    pub market_depth: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            market_summary: "/api/nots/market-summary/".into(),
            market_open: "/api/nots/nepse-data/market-open".into(),
            nepse_index: "/api/nots/nepse-index".into(),
            live_market: "/api/nots/lives-market".into(),
            supply_demand: "/api/nots/nepse-data/supplydemand".into(),
            top_gainers: "/api/nots/top-ten/top-gainer".into(),
            top_losers: "/api/nots/top-ten/top-loser".into(),
            top_ten_trade: "/api/nots/top-ten/trade".into(),
            top_ten_transaction: "/api/nots/top-ten/transaction".into(),
            top_ten_turnover: "/api/nots/top-ten/turnover".into(),
            todays_price: "/api/nots/nepse-data/today-price".into(),
            price_volume: "/api/nots/securityDailyTradeStat/58".into(),
            company_list: "/api/nots/company/list".into(),
            security_list: "/api/nots/security?nonDelisted=true".into(),
            floor_sheet: "/api/nots/nepse-data/floorsheet".into(),
            index_graph: "/api/nots/graph/index/".into(),
            company_daily_graph: "/api/nots/market/graphdata/daily/".into(),
            company_details: "/api/nots/security/".into(),
            company_price_volume_history: "/api/nots/market/history/security/".into(),
            company_floorsheet: "/api/nots/security/floorsheet/".into(),
            market_depth: "/api/nots/nepse-data/marketdepth/".into(),
        }
    }
}

fn with_id(base: &str, id: impl std::fmt::Display) -> String {
    format!("{}/{id}", base.trim_end_matches('/'))
}

impl Endpoints {
    pub fn index_graph(&self, kind: IndexKind) -> String {
        with_id(&self.index_graph, kind.id())
    }

    pub fn company_daily_graph(&self, security_id: i32) -> String {
        with_id(&self.company_daily_graph, security_id)
    }

    pub fn company_details(&self, security_id: i32) -> String {
        with_id(&self.company_details, security_id)
    }

    pub fn company_price_volume_history(&self, security_id: i32) -> String {
        with_id(&self.company_price_volume_history, security_id)
    }

    pub fn company_floorsheet(&self, security_id: i32) -> String {
        with_id(&self.company_floorsheet, security_id)
    }

    pub fn market_depth(&self, security_id: i32) -> String {
        with_id(&self.market_depth, security_id)
    }
}
