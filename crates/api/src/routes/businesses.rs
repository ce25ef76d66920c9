//! Route definitions for `/businesses`, including each business's menu.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{businesses, products};
use crate::state::AppState;

/// ```text
/// GET    /                              -> list_businesses
/// POST   /                              -> create_business
/// GET    /{id}                          -> get_business
/// PUT    /{id}                          -> update_business
/// DELETE /{id}                          -> delete_business
/// PUT    /{id}/telegram                 -> set_telegram_chat
/// POST   /{id}/telegram/link-code       -> issue_link_code
/// GET    /{id}/subscription             -> current_subscription
/// GET    /{id}/subscriptions            -> subscription_history
/// GET    /{id}/analytics                -> analytics
/// GET    /{id}/products                 -> list_products
/// POST   /{id}/products                 -> create_product
/// GET    /{id}/products/{product_id}    -> get_product
/// PUT    /{id}/products/{product_id}    -> update_product
/// DELETE /{id}/products/{product_id}    -> delete_product
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(businesses::list_businesses).post(businesses::create_business),
        )
        .route(
            "/{id}",
            get(businesses::get_business)
                .put(businesses::update_business)
                .delete(businesses::delete_business),
        )
        .route("/{id}/telegram", put(businesses::set_telegram_chat))
        .route("/{id}/telegram/link-code", post(businesses::issue_link_code))
        .route("/{id}/subscription", get(businesses::current_subscription))
        .route("/{id}/subscriptions", get(businesses::subscription_history))
        .route("/{id}/analytics", get(businesses::analytics))
        .route(
            "/{id}/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/{id}/products/{product_id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
}
