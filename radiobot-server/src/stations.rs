use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json,
};
use radiobot_core::{GuildId, UserId};

use crate::{
    context::ServerContext,
    errors::ServerResult,
    schemas::{OwnerQuery, StationSchema, ValidatedJson},
    serialized::{Station, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/stations",
    tag = "stations",
    responses(
        (status = 200, body = Vec<Station>)
    )
)]
async fn list_stations(State(context): State<ServerContext>) -> ServerResult<Json<Vec<Station>>> {
    let stations = context.radio.stations().await?;

    Ok(Json(stations.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/v1/stations",
    tag = "stations",
    request_body = StationSchema,
    responses(
        (status = 200, body = Station)
    )
)]
async fn save_station(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<StationSchema>,
) -> ServerResult<Json<Station>> {
    let station = context.radio.save_station(body.into()).await?;

    Ok(Json(station.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/stations/{name}",
    tag = "stations",
    responses(
        (status = 200, body = Station)
    )
)]
async fn station(
    State(context): State<ServerContext>,
    Path(name): Path<String>,
) -> ServerResult<Json<Station>> {
    let station = context.radio.station(&name).await?;

    Ok(Json(station.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/stations/{name}",
    tag = "stations",
    params(OwnerQuery),
    responses(
        (status = 200, body = Vec<u64>, description = "The guilds whose radios were deleted with the station")
    )
)]
async fn delete_station(
    State(context): State<ServerContext>,
    Path(name): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> ServerResult<Json<Vec<GuildId>>> {
    let guild_ids = context.radio.delete_station(&name, query.owner_id).await?;

    Ok(Json(guild_ids))
}

#[utoipa::path(
    get,
    path = "/v1/stations/owners/{owner_id}",
    tag = "stations",
    responses(
        (status = 200, body = Vec<Station>)
    )
)]
async fn stations_by_owner(
    State(context): State<ServerContext>,
    Path(owner_id): Path<UserId>,
) -> ServerResult<Json<Vec<Station>>> {
    let stations = context.radio.stations_by_owner(owner_id).await?;

    Ok(Json(stations.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_stations).put(save_station))
        .route("/owners/:owner_id", get(stations_by_owner))
        .route("/:name", get(station).delete(delete_station))
}
