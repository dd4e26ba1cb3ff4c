use std::{collections::HashMap, sync::Arc};

use async_stream::stream;
use futures::{StreamExt, future::BoxFuture};
use reqwest::{Client, Method, StatusCode, header};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;

use crate::dao::{
    game_store::{GameFeed, GameStore},
    models::{GameEntity, GameUpdate, ScoreBoard, TeamAnswerResultEntity, TeamEntity},
    storage::{StorageError, StorageResult},
};

use super::{
    config::RtdbConfig,
    error::{RtdbDaoError, RtdbResult},
    events::{EventStreamParser, RtdbEvent},
};

/// Game store talking to a hosted realtime database over its REST and streaming API.
#[derive(Clone)]
pub struct RtdbGameStore {
    client: Client,
    base_url: Arc<str>,
    auth: Option<Arc<str>>,
}

impl RtdbGameStore {
    /// Build the HTTP client and verify the database answers.
    pub async fn connect(config: RtdbConfig) -> RtdbResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| RtdbDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::<str>::from(config.base_url.trim_end_matches('/')),
            auth: config.auth.map(Arc::<str>::from),
        };

        store.ping().await?;
        Ok(store)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}.json", self.base_url, path);
        let builder = self.client.request(method, url);
        match self.auth {
            Some(ref auth) => builder.query(&[("auth", auth.as_ref())]),
            None => builder,
        }
    }

    async fn ping(&self) -> RtdbResult<()> {
        const PATH: &str = "games";
        let response = self
            .request(Method::GET, PATH)
            .query(&[("shallow", "true")])
            .send()
            .await
            .map_err(|source| RtdbDaoError::RequestSend {
                path: PATH.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(RtdbDaoError::RequestStatus {
                path: PATH.to_string(),
                status: response.status(),
            })
        }
    }

    async fn get_value<T>(&self, path: &str, query: &[(&str, String)]) -> RtdbResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, path)
            .query(query)
            .send()
            .await
            .map_err(|source| RtdbDaoError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let value = response.json::<Value>().await.map_err(|source| {
                    RtdbDaoError::DecodeResponse {
                        path: path.to_string(),
                        source,
                    }
                })?;
                if value.is_null() {
                    return Ok(None);
                }
                serde_json::from_value(value)
                    .map(Some)
                    .map_err(|source| RtdbDaoError::DeserializeValue {
                        path: path.to_string(),
                        source,
                    })
            }
            other => Err(RtdbDaoError::RequestStatus {
                path: path.to_string(),
                status: other,
            }),
        }
    }

    async fn patch_value<T>(&self, path: &str, body: &T) -> RtdbResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PATCH, path)
            .json(body)
            .send()
            .await
            .map_err(|source| RtdbDaoError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(RtdbDaoError::RequestStatus {
                path: path.to_string(),
                status: response.status(),
            })
        }
    }

    async fn open_event_stream(&self, path: &str) -> RtdbResult<reqwest::Response> {
        let response = self
            .request(Method::GET, path)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|source| RtdbDaoError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(RtdbDaoError::RequestStatus {
                path: path.to_string(),
                status: response.status(),
            })
        }
    }
}

fn game_path(game_code: &str) -> String {
    format!("games/{game_code}")
}

impl GameStore for RtdbGameStore {
    fn watch_game(&self, game_code: &str) -> BoxFuture<'static, StorageResult<GameFeed>> {
        let store = self.clone();
        let path = game_path(game_code);
        Box::pin(async move {
            let response = store.open_event_stream(&path).await?;
            debug!(%path, "realtime event stream opened");

            let feed = stream! {
                let mut parser = EventStreamParser::new();
                let mut chunks = Box::pin(response.bytes_stream());

                while let Some(chunk) = chunks.next().await {
                    let chunk = match chunk {
                        Ok(chunk) => chunk,
                        Err(source) => {
                            yield Err(StorageError::from(RtdbDaoError::StreamRead { path: path.clone(), source }));
                            return;
                        }
                    };

                    for event in parser.push(&chunk) {
                        match event {
                            RtdbEvent::Changed => {
                                // Payloads may be partial patches; re-read the whole record.
                                yield store.get_value::<GameEntity>(&path, &[]).await.map_err(StorageError::from);
                            }
                            RtdbEvent::KeepAlive => {}
                            RtdbEvent::Closed(reason) => {
                                yield Err(StorageError::from(RtdbDaoError::StreamClosed { path: path.clone(), reason }));
                                return;
                            }
                        }
                    }
                }
            };

            let feed: GameFeed = feed.boxed();
            Ok(feed)
        })
    }

    fn fetch_game(&self, game_code: &str) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        let path = game_path(game_code);
        Box::pin(async move { store.get_value(&path, &[]).await.map_err(Into::into) })
    }

    fn fetch_active_teams(
        &self,
        game_code: &str,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        let query = [
            ("orderBy", "\"gameCode\"".to_string()),
            ("equalTo", format!("\"{game_code}\"")),
        ];
        Box::pin(async move {
            let teams = store
                .get_value::<HashMap<String, TeamEntity>>("teams", &query)
                .await?
                .unwrap_or_default();

            let mut teams: Vec<TeamEntity> = teams
                .into_iter()
                .map(|(id, team)| TeamEntity { id, ..team })
                .filter(TeamEntity::is_active)
                .collect();
            teams.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(teams)
        })
    }

    fn fetch_answer_result(
        &self,
        game_code: &str,
        question_id: &str,
        team_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<TeamAnswerResultEntity>>> {
        let store = self.clone();
        let path = format!("answers/{game_code}/{question_id}/{team_id}");
        Box::pin(async move { store.get_value(&path, &[]).await.map_err(Into::into) })
    }

    fn fetch_all_scores(&self, game_code: &str) -> BoxFuture<'static, StorageResult<ScoreBoard>> {
        let store = self.clone();
        let path = format!("scores/{game_code}");
        Box::pin(async move {
            let scores = store.get_value::<ScoreBoard>(&path, &[]).await?;
            Ok(scores.unwrap_or_default())
        })
    }

    fn apply_update(
        &self,
        game_code: &str,
        update: GameUpdate,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let path = game_path(game_code);
        Box::pin(async move {
            store
                .patch_value(&path, &update)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}
