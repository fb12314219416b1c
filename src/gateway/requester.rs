//! HTTP client for the hosted backend.
//!
//! This module provides the [`Gateway`] repository trait used by the rest of
//! the board and [`RestGateway`], its implementation against a PostgREST
//! (Supabase) endpoint.

use std::time::Duration;

use log::{debug, info};
use mockall::automock;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::broadcast;

use crate::{
    error::GatewayError,
    gateway::rows::{
        BroadcastBody, BroadcastMessage, ChangeKind, DayFilter, JUMMAH_ROW_ID, JummahRow, Profile,
        RowChange, Table,
    },
    prayers::{DailyHadith, HadithItem, JummahSetting, PrayerDay},
};

/// Capacity of the change stream before slow subscribers start lagging.
const CHANGES_CAPACITY: usize = 64;

/// Realtime topic on which reload signals are broadcast.
const RELOAD_TOPIC: &str = "prayer-times";

/// Repository over the backend tables.
///
/// This trait abstracts the HTTP operations for easier testing with mocks.
#[automock]
pub trait Gateway {
    /// Lists prayer days matching `filter`, ordered by date.
    async fn list_days(&self, filter: DayFilter) -> Result<Vec<PrayerDay>, GatewayError>;
    /// Inserts one prayer day and returns the stored row.
    async fn insert_day(&self, day: &PrayerDay) -> Result<PrayerDay, GatewayError>;
    /// Inserts many prayer days in one request.
    async fn insert_days(&self, days: &[PrayerDay]) -> Result<Vec<PrayerDay>, GatewayError>;
    async fn update_day(&self, id: &str, day: &PrayerDay) -> Result<PrayerDay, GatewayError>;
    async fn delete_day(&self, id: &str) -> Result<(), GatewayError>;
    /// Deletes every prayer day.
    async fn delete_all_days(&self) -> Result<(), GatewayError>;

    async fn list_hadiths(&self) -> Result<Vec<HadithItem>, GatewayError>;
    async fn insert_hadith(&self, hadith: &HadithItem) -> Result<HadithItem, GatewayError>;
    async fn update_hadith(
        &self,
        id: &str,
        hadith: &HadithItem,
    ) -> Result<HadithItem, GatewayError>;
    async fn delete_hadith(&self, id: &str) -> Result<(), GatewayError>;

    /// Lists calendar hadiths for `month`, including month-less rows.
    async fn list_daily_hadiths(&self, month: u32) -> Result<Vec<DailyHadith>, GatewayError>;
    async fn insert_daily_hadith(&self, hadith: &DailyHadith)
    -> Result<DailyHadith, GatewayError>;
    async fn update_daily_hadith(
        &self,
        id: &str,
        hadith: &DailyHadith,
    ) -> Result<DailyHadith, GatewayError>;
    async fn delete_daily_hadith(&self, id: &str) -> Result<(), GatewayError>;

    async fn get_jummah(&self) -> Result<Option<JummahSetting>, GatewayError>;
    async fn upsert_jummah(&self, setting: &JummahSetting) -> Result<JummahSetting, GatewayError>;

    /// Fetches the profile of `user_id`, `None` when it does not exist.
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, GatewayError>;

    /// Asks every connected client to reload everything.
    async fn broadcast_reload(&self) -> Result<(), GatewayError>;

    /// Subscribes to the row changes observed by this gateway.
    fn changes(&self) -> broadcast::Receiver<RowChange>;
}

/// [`Gateway`] over the PostgREST API of a Supabase project.
///
/// # Examples
///
/// ```no_run
/// let gateway = RestGateway::new("https://project.supabase.co", "anon-key", None, Duration::from_secs(15))?;
/// let days = gateway.list_days(DayFilter::All).await?;
/// println!("{} days", days.len());
/// ```
pub struct RestGateway {
    /// Project url, without trailing slash
    url: String,
    /// Public api key, sent on every request
    api_key: String,
    /// User token for row level security, the api key is used without one
    access_token: Option<String>,
    client: Client,
    changes: broadcast::Sender<RowChange>,
}

impl RestGateway {
    /// Create a new [RestGateway].
    ///
    /// # Arguments
    ///
    /// * `url` - Base URL of the project, e.g. `https://project.supabase.co`.
    /// * `api_key` - The project api key.
    /// * `access_token` - Signed-in user token, needed for admin writes.
    /// * `timeout` - Bound applied to every request.
    pub fn new(
        url: &str,
        api_key: &str,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;
        let (changes, _) = broadcast::channel(CHANGES_CAPACITY);

        Ok(RestGateway {
            url: url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            access_token,
            client,
            changes,
        })
    }

    fn request(&self, method: Method, table: Table) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", &self.url, table.name());
        debug!("request {} {}", method, &url);

        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(self.access_token.as_deref().unwrap_or(&self.api_key))
    }

    /// Same as [`Self::request`] but asks for the written rows back.
    fn write(&self, method: Method, table: Table) -> RequestBuilder {
        self.request(method, table)
            .header("Prefer", "return=representation")
    }

    fn notify(&self, table: Table, kind: ChangeKind) {
        // No subscriber is not an error
        let _ = self.changes.send(RowChange::Row { table, kind });
    }
}

fn check(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        return Err(GatewayError::Status(status.as_u16()));
    }
    Ok(response)
}

async fn fetch<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, GatewayError> {
    let response = check(builder.send().await?)?;
    Ok(response.json().await?)
}

/// Sends a write that returns the affected rows and keeps the first one.
async fn fetch_one<T: DeserializeOwned, B: Serialize + ?Sized>(
    builder: RequestBuilder,
    body: &B,
) -> Result<T, GatewayError> {
    let rows: Vec<T> = fetch(builder.json(body)).await?;
    rows.into_iter()
        .next()
        .ok_or_else(|| GatewayError::Unavailable("no row returned".to_owned()))
}

impl Gateway for RestGateway {
    /// Request `GET /rest/v1/prayer_times` with the date filter.
    async fn list_days(&self, filter: DayFilter) -> Result<Vec<PrayerDay>, GatewayError> {
        info!("request prayer days {:?}", filter);

        let days: Vec<PrayerDay> = fetch(
            self.request(Method::GET, Table::PrayerTimes)
                .query(&filter.query()),
        )
        .await?;

        debug!("response prayer days -> {:?}", &days);

        Ok(days)
    }

    async fn insert_day(&self, day: &PrayerDay) -> Result<PrayerDay, GatewayError> {
        info!("insert prayer day {}", day.date);
        let stored: PrayerDay = fetch_one(
            self.write(Method::POST, Table::PrayerTimes),
            &day.without_id(),
        )
        .await?;
        self.notify(Table::PrayerTimes, ChangeKind::Insert);
        Ok(stored)
    }

    async fn insert_days(&self, days: &[PrayerDay]) -> Result<Vec<PrayerDay>, GatewayError> {
        info!("insert {} prayer days", days.len());
        let payload: Vec<PrayerDay> = days.iter().map(PrayerDay::without_id).collect();
        let stored: Vec<PrayerDay> =
            fetch(self.write(Method::POST, Table::PrayerTimes).json(&payload)).await?;
        self.notify(Table::PrayerTimes, ChangeKind::Insert);
        Ok(stored)
    }

    async fn update_day(&self, id: &str, day: &PrayerDay) -> Result<PrayerDay, GatewayError> {
        info!("update prayer day {} ({})", id, day.date);
        let stored: PrayerDay = fetch_one(
            self.write(Method::PATCH, Table::PrayerTimes)
                .query(&[("id", format!("eq.{}", id))]),
            &day.without_id(),
        )
        .await?;
        self.notify(Table::PrayerTimes, ChangeKind::Update);
        Ok(stored)
    }

    async fn delete_day(&self, id: &str) -> Result<(), GatewayError> {
        info!("delete prayer day {}", id);
        check(
            self.request(Method::DELETE, Table::PrayerTimes)
                .query(&[("id", format!("eq.{}", id))])
                .send()
                .await?,
        )?;
        self.notify(Table::PrayerTimes, ChangeKind::Delete);
        Ok(())
    }

    async fn delete_all_days(&self) -> Result<(), GatewayError> {
        info!("delete all prayer days");
        // PostgREST refuses unfiltered deletes
        check(
            self.request(Method::DELETE, Table::PrayerTimes)
                .query(&[("id", "not.is.null")])
                .send()
                .await?,
        )?;
        self.notify(Table::PrayerTimes, ChangeKind::Delete);
        Ok(())
    }

    async fn list_hadiths(&self) -> Result<Vec<HadithItem>, GatewayError> {
        info!("request hadith collection");
        fetch(
            self.request(Method::GET, Table::Hadiths)
                .query(&[("select", "*"), ("order", "id.asc")]),
        )
        .await
    }

    async fn insert_hadith(&self, hadith: &HadithItem) -> Result<HadithItem, GatewayError> {
        let payload = HadithItem {
            id: None,
            ..hadith.clone()
        };
        let stored = fetch_one(self.write(Method::POST, Table::Hadiths), &payload).await?;
        self.notify(Table::Hadiths, ChangeKind::Insert);
        Ok(stored)
    }

    async fn update_hadith(
        &self,
        id: &str,
        hadith: &HadithItem,
    ) -> Result<HadithItem, GatewayError> {
        let payload = HadithItem {
            id: None,
            ..hadith.clone()
        };
        let stored = fetch_one(
            self.write(Method::PATCH, Table::Hadiths)
                .query(&[("id", format!("eq.{}", id))]),
            &payload,
        )
        .await?;
        self.notify(Table::Hadiths, ChangeKind::Update);
        Ok(stored)
    }

    async fn delete_hadith(&self, id: &str) -> Result<(), GatewayError> {
        check(
            self.request(Method::DELETE, Table::Hadiths)
                .query(&[("id", format!("eq.{}", id))])
                .send()
                .await?,
        )?;
        self.notify(Table::Hadiths, ChangeKind::Delete);
        Ok(())
    }

    async fn list_daily_hadiths(&self, month: u32) -> Result<Vec<DailyHadith>, GatewayError> {
        info!("request daily hadiths for month {}", month);
        fetch(self.request(Method::GET, Table::DailyHadiths).query(&[
            ("select", "*".to_owned()),
            ("or", format!("(month.eq.{},month.is.null)", month)),
            ("order", "day_of_month.asc".to_owned()),
        ]))
        .await
    }

    async fn insert_daily_hadith(
        &self,
        hadith: &DailyHadith,
    ) -> Result<DailyHadith, GatewayError> {
        let payload = DailyHadith {
            id: None,
            ..hadith.clone()
        };
        let stored = fetch_one(self.write(Method::POST, Table::DailyHadiths), &payload).await?;
        self.notify(Table::DailyHadiths, ChangeKind::Insert);
        Ok(stored)
    }

    async fn update_daily_hadith(
        &self,
        id: &str,
        hadith: &DailyHadith,
    ) -> Result<DailyHadith, GatewayError> {
        let payload = DailyHadith {
            id: None,
            ..hadith.clone()
        };
        let stored = fetch_one(
            self.write(Method::PATCH, Table::DailyHadiths)
                .query(&[("id", format!("eq.{}", id))]),
            &payload,
        )
        .await?;
        self.notify(Table::DailyHadiths, ChangeKind::Update);
        Ok(stored)
    }

    async fn delete_daily_hadith(&self, id: &str) -> Result<(), GatewayError> {
        check(
            self.request(Method::DELETE, Table::DailyHadiths)
                .query(&[("id", format!("eq.{}", id))])
                .send()
                .await?,
        )?;
        self.notify(Table::DailyHadiths, ChangeKind::Delete);
        Ok(())
    }

    async fn get_jummah(&self) -> Result<Option<JummahSetting>, GatewayError> {
        info!("request jummah setting");
        let rows: Vec<JummahSetting> = fetch(
            self.request(Method::GET, Table::JummahSettings)
                .query(&[("select", "*"), ("limit", "1")]),
        )
        .await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_jummah(&self, setting: &JummahSetting) -> Result<JummahSetting, GatewayError> {
        info!("upsert jummah setting {:?}", setting);
        let stored = fetch_one(
            self.request(Method::POST, Table::JummahSettings)
                .query(&[("on_conflict", "id")])
                .header("Prefer", "resolution=merge-duplicates,return=representation"),
            &JummahRow {
                id: JUMMAH_ROW_ID,
                setting,
            },
        )
        .await?;
        self.notify(Table::JummahSettings, ChangeKind::Update);
        Ok(stored)
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, GatewayError> {
        debug!("request profile of {}", user_id);
        let rows: Vec<Profile> = fetch(self.request(Method::GET, Table::Profiles).query(&[
            ("select", "id,role".to_owned()),
            ("id", format!("eq.{}", user_id)),
        ]))
        .await?;
        Ok(rows.into_iter().next())
    }

    /// Request `POST /realtime/v1/api/broadcast` with a `reload` event.
    async fn broadcast_reload(&self) -> Result<(), GatewayError> {
        let url = format!("{}/realtime/v1/api/broadcast", &self.url);
        info!("broadcast reload to all clients");

        let body = BroadcastBody {
            messages: vec![BroadcastMessage {
                topic: RELOAD_TOPIC.to_owned(),
                event: "reload".to_owned(),
                payload: serde_json::json!({}),
            }],
        };

        check(
            self.client
                .post(&url)
                .header("apikey", &self.api_key)
                .bearer_auth(self.access_token.as_deref().unwrap_or(&self.api_key))
                .json(&body)
                .send()
                .await?,
        )?;

        let _ = self.changes.send(RowChange::Reload);
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<RowChange> {
        self.changes.subscribe()
    }
}
