use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use url::Url;

use crate::formats::{
    ChapterContent, ChapterContentResponse, ReadingPosition, TranslateRequest, TranslateResponse,
    Translation,
};
use crate::session::state::TranslationService;

/// The remote service a reading session talks to.
#[async_trait]
pub trait ReaderBackend: Send + Sync {
    async fn fetch_chapter(
        &self,
        book_id: u64,
        chapter_order: u32,
    ) -> anyhow::Result<ChapterContent>;

    async fn save_reading_progress(
        &self,
        book_id: u64,
        position: ReadingPosition,
    ) -> anyhow::Result<()>;

    async fn translate(
        &self,
        text: &str,
        book_id: u64,
        service: TranslationService,
    ) -> anyhow::Result<Translation>;
}

#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: &str, auth_token: Option<String>) -> anyhow::Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            anyhow::bail!("api base url is empty");
        }
        // A trailing slash makes `Url::join` append instead of replacing the last segment.
        let base_url = Url::parse(&format!("{trimmed}/"))
            .with_context(|| format!("parse api base url: {base_url}"))?;
        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            anyhow::bail!("api base url must be http/https: {base_url}");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;

        Ok(Self {
            client,
            base_url,
            auth_token: auth_token.filter(|token| !token.trim().is_empty()),
        })
    }

    pub fn endpoint(&self, path: &str) -> anyhow::Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("build endpoint url for {path}"))
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> anyhow::Result<String> {
        let request = match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request
            .send()
            .await
            .with_context(|| format!("send {what} request"))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .with_context(|| format!("read {what} response body"))?;
        if !status.is_success() {
            let message = parse_error_message(&raw)
                .or_else(|| Some(raw.trim().to_owned()).filter(|raw| !raw.is_empty()))
                .unwrap_or_else(|| format!("server error ({status})"));
            anyhow::bail!("{what} failed ({status}): {message}");
        }
        Ok(raw)
    }
}

#[async_trait]
impl ReaderBackend for HttpBackend {
    async fn fetch_chapter(
        &self,
        book_id: u64,
        chapter_order: u32,
    ) -> anyhow::Result<ChapterContent> {
        let mut url = self.endpoint(&format!("books/{book_id}/chapter_content/"))?;
        url.query_pairs_mut()
            .append_pair("chapter", &chapter_order.to_string());

        let raw = self.send(self.client.get(url), "chapter content").await?;
        let response: ChapterContentResponse =
            serde_json::from_str(&raw).context("parse chapter content response")?;
        Ok(response.into_content(chapter_order))
    }

    async fn save_reading_progress(
        &self,
        book_id: u64,
        position: ReadingPosition,
    ) -> anyhow::Result<()> {
        let url = self.endpoint(&format!("books/{book_id}/update_progress/"))?;
        self.send(self.client.post(url).json(&position), "update progress")
            .await?;
        Ok(())
    }

    async fn translate(
        &self,
        text: &str,
        book_id: u64,
        service: TranslationService,
    ) -> anyhow::Result<Translation> {
        let url = self.endpoint("translate/")?;
        let body = TranslateRequest {
            text,
            book: book_id,
            service,
        };
        let raw = self
            .send(self.client.post(url).json(&body), "translate")
            .await?;
        let response: TranslateResponse =
            serde_json::from_str(&raw).context("parse translate response")?;
        response.into_result()
    }
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    ["error", "detail"]
        .iter()
        .find_map(|key| value.get(key)?.as_str().map(str::to_owned))
}
