use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::pricing::{listing_fee, FeePolicy, ListingFee, PricingConfig};
use crate::errors::AppError;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListingFeeParams {
    /// Listing price as a decimal string, e.g. "2500".
    pub price: String,
    /// Quote the flat admin-console rate instead of the seller tiers.
    #[serde(default)]
    pub admin: bool,
}

/// GET /pricing/listing-fee
///
/// Quotes the platform fee and seller earning for a listing price.
#[utoipa::path(
    get,
    path = "/pricing/listing-fee",
    params(
        ("price" = String, Query, description = "Listing price"),
        ("admin" = Option<bool>, Query, description = "Use the admin listing rate"),
    ),
    responses(
        (status = 200, description = "Fee quote", body = ListingFee),
        (status = 400, description = "Price missing, malformed or negative"),
    ),
    tag = "pricing"
)]
pub async fn listing_fee_quote(
    pricing: web::Data<PricingConfig>,
    query: web::Query<ListingFeeParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let price = BigDecimal::from_str(params.price.trim())
        .map_err(|_| AppError::BadRequest(format!("'{}' is not a valid price", params.price)))?;
    if price < BigDecimal::from(0) {
        return Err(AppError::BadRequest("price must not be negative".to_string()));
    }

    let quote = if params.admin {
        listing_fee(&price, &FeePolicy::admin_listing())
    } else {
        listing_fee(&price, &pricing.listing_fee)
    };
    Ok(HttpResponse::Ok().json(quote))
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};
    use serde_json::Value;

    use super::*;

    async fn quote(uri: &str) -> (u16, Value) {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(PricingConfig::default()))
                .route("/pricing/listing-fee", web::get().to(listing_fee_quote)),
        )
        .await;
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        let status = resp.status().as_u16();
        let body = test::read_body(resp).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[actix_web::test]
    async fn quotes_listing_tier() {
        let (status, body) = quote("/pricing/listing-fee?price=2500").await;
        assert_eq!(status, 200);
        assert_eq!(body["platform_fee_percentage"], 28);
        assert_eq!(body["platform_fee"], "700");
        assert_eq!(body["seller_earning"], "1800");
    }

    #[actix_web::test]
    async fn quotes_admin_rate() {
        let (status, body) = quote("/pricing/listing-fee?price=2500&admin=true").await;
        assert_eq!(status, 200);
        assert_eq!(body["platform_fee_percentage"], 10);
        assert_eq!(body["platform_fee"], "250");
    }

    #[actix_web::test]
    async fn rejects_bad_price() {
        let (status, _) = quote("/pricing/listing-fee?price=abc").await;
        assert_eq!(status, 400);
        let (status, _) = quote("/pricing/listing-fee?price=-5").await;
        assert_eq!(status, 400);
    }
}
