use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use radiobot_core::{ChannelId, GuildId, RoleId, UserId};
use radiobot_radio::{NewRadio, NewStation, StationId, StationRef};
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::errors::{ServerError, ServerResult};

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RadioSchema {
    #[schema(value_type = u64)]
    pub channel_id: ChannelId,
    /// A playlist URL or a search string. Either this or `stationId` must be set.
    #[validate(length(min = 1, max = 512))]
    pub station_link: Option<String>,
    /// A station from the catalog
    #[schema(value_type = Option<i64>)]
    pub station_id: Option<StationId>,
    #[serde(default = "default_shuffle")]
    pub always_shuffle: bool,
    #[serde(default)]
    #[validate(length(max = 64))]
    #[schema(value_type = Vec<u64>)]
    pub managing_roles: Vec<RoleId>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VolumeSchema {
    /// A whole number between 1 and 1000
    #[validate(length(min = 1, max = 16))]
    pub volume: String,
    /// The roles of the member changing the volume
    #[serde(default)]
    #[schema(value_type = Vec<u64>)]
    pub roles: Vec<RoleId>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CallerSchema {
    /// The roles of the member performing the action
    #[serde(default)]
    #[schema(value_type = Vec<u64>)]
    pub roles: Vec<RoleId>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StationSchema {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(min = 1, max = 512))]
    pub playlist_link: String,
    #[schema(value_type = u64)]
    pub owner_id: UserId,
}

#[derive(Debug, IntoParams, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQuery {
    /// The user the station belongs to
    #[param(value_type = u64)]
    pub owner_id: UserId,
}

#[derive(Debug, IntoParams, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    /// Only stream events of this guild
    #[param(value_type = Option<u64>)]
    pub guild_id: Option<GuildId>,
}

impl RadioSchema {
    /// Exactly one of the link and the station id has to be set
    pub fn into_new_radio(self, guild_id: GuildId) -> ServerResult<NewRadio> {
        let station = match (self.station_link, self.station_id) {
            (Some(link), None) => StationRef::Link(link),
            (None, Some(station_id)) => StationRef::Catalog(station_id),
            _ => {
                return Err(ServerError::BadRequest(
                    "Either a station link or a station id is required".to_string(),
                ))
            }
        };

        Ok(NewRadio {
            guild_id,
            channel_id: self.channel_id,
            station,
            always_shuffle: self.always_shuffle,
            managing_roles: self.managing_roles,
        })
    }
}

impl From<StationSchema> for NewStation {
    fn from(value: StationSchema) -> Self {
        Self {
            name: value.name,
            playlist_link: value.playlist_link,
            owner_id: value.owner_id,
        }
    }
}

fn default_shuffle() -> bool {
    true
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|_| (StatusCode::BAD_REQUEST, "JSON parse failed"))?;

        extracted_json
            .0
            .validate()
            .map_err(|_| (StatusCode::BAD_REQUEST, "Request body is invalid"))?;

        Ok(Self(extracted_json.0))
    }
}
