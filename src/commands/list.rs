//! Listing commands that drive the remote list controller.
//!
//! - `list`: one page, or a multi-page search
//! - `options`: filter dropdown values
//! - `resources`: known resource definitions

use std::sync::Arc;

use owo_colors::OwoColorize;
use serde_json::json;

use super::{print_json, surface_error};
use crate::config::Config;
use crate::controller::{ControllerEvent, ControllerOptions, RemoteListController};
use crate::display::{ResourceRow, format_filter_options, format_list_view, format_resource_table};
use crate::error::Result;
use crate::query::{QueryClient, QueryKind};
use crate::remote::{HttpBackend, ListQuery};

pub struct ListOptions {
    pub resource: String,
    pub filters: Vec<(String, String)>,
    pub page: Option<u32>,
    pub search: Option<String>,
    pub query: Option<String>,
    pub json: bool,
}

/// Merge a saved query string with explicit flags. Flags win.
pub fn build_list_query(
    saved: Option<&str>,
    filters: &[(String, String)],
    page: Option<u32>,
    search: Option<&str>,
) -> ListQuery {
    let mut query = saved
        .map(ListQuery::from_query_string)
        .unwrap_or_default();
    for (key, value) in filters {
        query.filters.set(key.clone(), value.clone());
    }
    if let Some(page) = page {
        query.page = page.max(1);
    }
    if let Some(search) = search {
        query.search_text = search.to_string();
    }
    query
}

fn new_controller(
    config: &Config,
    resource: &str,
) -> Result<RemoteListController<HttpBackend>> {
    let spec = config.resource(resource)?;
    let backend = Arc::new(HttpBackend::from_config(config)?);
    let client = Arc::new(QueryClient::new(&config.query));
    let options = ControllerOptions::from_config(config, &spec);
    Ok(RemoteListController::new(backend, client, spec, options))
}

pub async fn cmd_list(options: ListOptions) -> Result<()> {
    let config = Config::load()?;
    let query = build_list_query(
        options.query.as_deref(),
        &options.filters,
        options.page,
        options.search.as_deref(),
    );
    query.validate()?;

    let mut controller = new_controller(&config, &options.resource)?.with_initial_query(query);
    controller.start();
    controller.settle().await;

    let view = controller.view();
    if let Some(error) = &view.error
        && view.display_items.is_empty()
    {
        return Err(surface_error(error));
    }

    if options.json {
        return print_json(&json!({
            "resource": controller.spec().name,
            "query": controller.query().to_query_string(),
            "mode": view.mode,
            "page": view.pagination.page,
            "total_pages": view.pagination.total_pages,
            "failed_search_pages": view.failed_search_pages,
            "error": view.error,
            "items": view.display_items,
        }));
    }

    print!("{}", format_list_view(&view, controller.spec()));
    Ok(())
}

pub async fn cmd_options(resource: &str, filters: Vec<(String, String)>, json: bool) -> Result<()> {
    let config = Config::load()?;
    let query = build_list_query(None, &filters, None, None);
    query.validate()?;

    let mut controller = new_controller(&config, resource)?.with_initial_query(query);
    controller.start();
    let events = controller.settle().await;

    // Options failures never surface in the list view, so report them here
    for event in &events {
        if let ControllerEvent::FetchFailed {
            kind: QueryKind::Options,
            error,
        } = event
        {
            return Err(surface_error(error));
        }
    }

    let view = controller.view();
    if json {
        return print_json(&view.filter_options);
    }
    print!("{}", format_filter_options(&view.filter_options));
    Ok(())
}

pub fn cmd_resources(json: bool) -> Result<()> {
    let config = Config::load()?;
    let resources = config.all_resources();

    if json {
        return print_json(&resources);
    }

    if resources.is_empty() {
        println!("{}", "No resources configured".dimmed());
        return Ok(());
    }

    let rows: Vec<ResourceRow> = resources
        .values()
        .map(|spec| ResourceRow::new(spec, config.debounce_for(spec).as_millis() as u64))
        .collect();
    println!("{}", format_resource_table(rows));
    Ok(())
}
