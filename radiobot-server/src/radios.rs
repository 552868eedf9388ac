use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json,
};
use radiobot_core::GuildId;

use crate::{
    context::ServerContext,
    errors::ServerResult,
    schemas::{CallerSchema, RadioSchema, ValidatedJson, VolumeSchema},
    serialized::{Radio, Session, ToSerialized, Volume},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/radios/{guild_id}",
    tag = "radios",
    responses(
        (status = 200, body = Radio)
    )
)]
async fn radio(
    State(context): State<ServerContext>,
    Path(guild_id): Path<GuildId>,
) -> ServerResult<Json<Radio>> {
    let radio = context.radio.radio(guild_id).await?;

    Ok(Json(radio.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/v1/radios/{guild_id}",
    tag = "radios",
    request_body = RadioSchema,
    responses(
        (status = 200, body = Radio)
    )
)]
async fn save_radio(
    State(context): State<ServerContext>,
    Path(guild_id): Path<GuildId>,
    ValidatedJson(body): ValidatedJson<RadioSchema>,
) -> ServerResult<Json<Radio>> {
    let radio = context
        .radio
        .save_radio(body.into_new_radio(guild_id)?)
        .await?;

    Ok(Json(radio.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/radios/{guild_id}",
    tag = "radios",
    responses(
        (status = 200, description = "The radio was deleted and its session disconnected")
    )
)]
async fn delete_radio(
    State(context): State<ServerContext>,
    Path(guild_id): Path<GuildId>,
) -> ServerResult<()> {
    context.radio.delete_radio(guild_id).await?;

    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/radios/{guild_id}/restart",
    tag = "radios",
    responses(
        (status = 200, body = Radio)
    )
)]
async fn restart_radio(
    State(context): State<ServerContext>,
    Path(guild_id): Path<GuildId>,
) -> ServerResult<Json<Radio>> {
    let radio = context.radio.restart_radio(guild_id).await?;

    Ok(Json(radio.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/radios/{guild_id}/volume",
    tag = "radios",
    responses(
        (status = 200, body = Volume)
    )
)]
async fn volume(
    State(context): State<ServerContext>,
    Path(guild_id): Path<GuildId>,
) -> ServerResult<Json<Volume>> {
    let volume = context.radio.volume(guild_id)?;

    Ok(Json(volume.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/v1/radios/{guild_id}/volume",
    tag = "radios",
    request_body = VolumeSchema,
    responses(
        (status = 200, body = Volume)
    )
)]
async fn set_volume(
    State(context): State<ServerContext>,
    Path(guild_id): Path<GuildId>,
    ValidatedJson(body): ValidatedJson<VolumeSchema>,
) -> ServerResult<Json<Volume>> {
    let volume = context
        .radio
        .set_volume(guild_id, &body.roles, &body.volume)
        .await?;

    Ok(Json(volume.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/radios/{guild_id}/next",
    tag = "radios",
    request_body = CallerSchema,
    responses(
        (status = 200, description = "The radio moved on to the next track")
    )
)]
async fn next(
    State(context): State<ServerContext>,
    Path(guild_id): Path<GuildId>,
    ValidatedJson(body): ValidatedJson<CallerSchema>,
) -> ServerResult<()> {
    context.radio.skip(guild_id, &body.roles).await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/v1/radios/{guild_id}/current",
    tag = "radios",
    responses(
        (status = 200, body = Session)
    )
)]
async fn current(
    State(context): State<ServerContext>,
    Path(guild_id): Path<GuildId>,
) -> ServerResult<Json<Session>> {
    let session = context.radio.current(guild_id)?;

    Ok(Json(session.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/:guild_id", get(radio).put(save_radio).delete(delete_radio))
        .route("/:guild_id/restart", post(restart_radio))
        .route("/:guild_id/volume", get(volume).put(set_volume))
        .route("/:guild_id/next", post(next))
        .route("/:guild_id/current", get(current))
}
