//! Scripted in-process backend for driving the list controller.

use std::sync::Arc;
use std::time::Duration;

use leadboard::error::{LeadboardError, Result};
use leadboard::remote::{ListBackend, ListQuery, RawPage};
use parking_lot::Mutex;
use serde_json::{Value, json};

/// What one request returns, and after how long.
pub struct Scripted {
    pub delay: Duration,
    pub result: Result<RawPage>,
}

impl Scripted {
    pub fn ok(page: RawPage) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(page),
        }
    }

    pub fn err(error: LeadboardError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(error),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Responder = dyn Fn(&str, &ListQuery) -> Scripted + Send + Sync;

pub struct ScriptedBackend {
    respond: Box<Responder>,
    calls: Mutex<Vec<(String, ListQuery)>>,
}

impl ScriptedBackend {
    pub fn new(respond: impl Fn(&str, &ListQuery) -> Scripted + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, ListQuery)> {
        self.calls.lock().clone()
    }

    pub fn count_calls(&self, predicate: impl Fn(&ListQuery) -> bool) -> usize {
        self.calls.lock().iter().filter(|(_, q)| predicate(q)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }
}

impl ListBackend for ScriptedBackend {
    async fn fetch_page(&self, resource: &str, query: &ListQuery) -> Result<RawPage> {
        self.calls.lock().push((resource.to_string(), query.clone()));
        let scripted = (self.respond)(resource, query);
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        scripted.result
    }
}

pub fn shop(id: u32, name: &str, city: &str, category: &str) -> Value {
    json!({
        "id": id,
        "shop_name": name,
        "city": city,
        "postcode": format!("{}{}", &city[..2].to_uppercase(), id % 10),
        "category": category,
        "phone": null,
    })
}

pub fn page(items: Vec<Value>, page: u32, total_pages: u32) -> RawPage {
    RawPage::from_json(
        json!({"results": items, "totalPages": total_pages, "currentPage": page}),
        page,
        None,
    )
    .expect("valid page")
}
