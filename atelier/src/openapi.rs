//! OpenAPI documentation for the `/api/v1` surface, served at `/api/openapi.json` and
//! rendered at `/api/docs`.

use utoipa::OpenApi;

use crate::api;
use crate::db::models::ateliers::{AtelierProfile, ManagerProfile, Subscription, SubscriptionPlan, SubscriptionStatus};
use crate::snapshot::{AggregateData, ChildCollections, FullAggregate, ReplacePayload};

#[derive(OpenApi)]
#[openapi(
    servers(
        (url = "/api/v1", description = "Atelier API")
    ),
    paths(
        api::handlers::ateliers::create_atelier,
        api::handlers::ateliers::get_atelier,
        api::handlers::snapshots::get_atelier_data,
        api::handlers::snapshots::replace_atelier_data,
    ),
    components(
        schemas(
            api::models::ateliers::AtelierCreate,
            api::models::ateliers::AtelierResponse,
            api::models::snapshots::ReplaceResponse,
            Subscription,
            SubscriptionStatus,
            SubscriptionPlan,
            ManagerProfile,
            AtelierProfile,
            ChildCollections,
            AggregateData,
            FullAggregate,
            ReplacePayload,
        )
    ),
    tags(
        (name = "ateliers", description = "Atelier registration and lookup."),
        (name = "snapshots", description = "Whole-aggregate read and replace of an atelier's data.

A replace is a full-state write: every child collection is cleared and repopulated from the payload, \
and a collection absent from the payload ends up empty. There is no delta synchronization and no \
protection against concurrent writers of the same atelier."),
    )
)]
pub struct ApiDoc;
