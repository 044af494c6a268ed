use owo_colors::OwoColorize;
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::controller::{DisplayMode, ListViewModel};
use crate::item::{DisplayItem, NOT_AVAILABLE};
use crate::options::FilterOptionSet;
use crate::query::{ErrorInfo, ErrorKind, QueryKind};
use crate::resource::ResourceSpec;

/// Cells longer than this are cut with an ellipsis.
const MAX_CELL_WIDTH: usize = 40;

/// A row in the `resources` table
#[derive(Tabled)]
pub struct ResourceRow {
    #[tabled(rename = "Resource")]
    pub name: String,
    #[tabled(rename = "Identity")]
    pub id_field: String,
    #[tabled(rename = "Search fields")]
    pub search_fields: String,
    #[tabled(rename = "Context")]
    pub context_keys: String,
    #[tabled(rename = "Debounce")]
    pub debounce: String,
}

impl ResourceRow {
    pub fn new(spec: &ResourceSpec, debounce_ms: u64) -> Self {
        Self {
            name: spec.name.clone(),
            id_field: spec.id_field.clone(),
            search_fields: join_or_dash(&spec.search_fields),
            context_keys: join_or_dash(&spec.context_keys),
            debounce: format!("{debounce_ms}ms"),
        }
    }
}

fn join_or_dash(values: &[String]) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.join(", ")
    }
}

pub fn format_resource_table(rows: Vec<ResourceRow>) -> String {
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}

/// Columns shown for a resource: the identity field first, then the display
/// fields in order.
pub fn table_columns(spec: &ResourceSpec) -> Vec<&str> {
    let mut columns = vec![spec.id_field.as_str()];
    for field in &spec.display_fields {
        if !columns.contains(&field.as_str()) {
            columns.push(field);
        }
    }
    columns
}

pub fn truncate_cell(value: &str) -> String {
    if value.chars().count() <= MAX_CELL_WIDTH {
        return value.to_string();
    }
    let cut: String = value.chars().take(MAX_CELL_WIDTH - 1).collect();
    format!("{cut}…")
}

pub fn format_items_table(items: &[DisplayItem], spec: &ResourceSpec) -> String {
    let columns = table_columns(spec);

    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.to_string()));
    for item in items {
        builder.push_record(columns.iter().map(|c| truncate_cell(item.get(c))));
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

/// Render one list view: status line, table (or empty notice) and footer.
pub fn format_list_view(view: &ListViewModel, spec: &ResourceSpec) -> String {
    let mut out = String::new();

    if let Some(error) = &view.error {
        out.push_str(&format_error(error, view.error_source));
        out.push('\n');
    }

    if view.is_initial_load {
        out.push_str(&format!("{}\n", "Loading...".dimmed()));
        return out;
    }

    if view.display_items.is_empty() {
        let notice = match view.mode {
            DisplayMode::Search => format!("No {} match \"{}\"", spec.name, view.search_input),
            DisplayMode::Page => format!("No {} found", spec.name),
        };
        out.push_str(&format!("{}\n", notice.dimmed()));
    } else {
        out.push_str(&format_items_table(&view.display_items, spec));
        out.push('\n');
    }

    out.push_str(&format_footer(view));
    out
}

pub fn format_footer(view: &ListViewModel) -> String {
    let mut out = String::new();
    match view.mode {
        DisplayMode::Page => {
            let pagination = &view.pagination;
            let total = pagination.total_pages.max(1);
            out.push_str(&format!(
                "{}",
                format!("Page {} of {}", pagination.page, total).dimmed()
            ));
            if pagination.has_next() {
                out.push_str(&format!(" {}", format!("(--page {})", pagination.page + 1).dimmed()));
            }
        }
        DisplayMode::Search => {
            out.push_str(&format!(
                "{} {}",
                format!("{} matches for", view.display_items.len()).dimmed(),
                view.search_input.cyan()
            ));
        }
    }
    out.push('\n');

    if !view.failed_search_pages.is_empty() {
        let pages: Vec<String> = view.failed_search_pages.iter().map(u32::to_string).collect();
        out.push_str(&format!(
            "{} {}\n",
            "Warning:".yellow(),
            format!("pages {} could not be searched", pages.join(", ")).dimmed()
        ));
    }

    if !view.applied_filters.is_empty() {
        let active: Vec<String> = view
            .applied_filters
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        out.push_str(&format!("{} {}\n", "Filters:".dimmed(), active.join(" ")));
    }
    out
}

pub fn format_error(error: &ErrorInfo, source: Option<QueryKind>) -> String {
    let label = match error.kind {
        ErrorKind::AuthExpired => "Session expired:",
        _ => "Error:",
    };
    match source {
        Some(kind) => format!("{} {} ({kind})", label.red().bold(), error.message),
        None => format!("{} {}", label.red().bold(), error.message),
    }
}

pub fn format_filter_options(options: &FilterOptionSet) -> String {
    if options.is_empty() {
        return format!("{}\n", "No filter options available".dimmed());
    }

    let mut out = String::new();
    if !options.categories.is_empty() {
        out.push_str(&format!("{}\n", "Categories:".cyan().bold()));
        for category in &options.categories {
            out.push_str(&format!("  {category}\n"));
        }
    }
    if !options.cities.is_empty() {
        out.push_str(&format!("{}\n", "Cities:".cyan().bold()));
        for city in &options.cities {
            let postcodes = options.postcodes_for(city);
            if postcodes.is_empty() {
                out.push_str(&format!("  {city}\n"));
            } else {
                out.push_str(&format!("  {} {}\n", city, postcodes.join(", ").dimmed()));
            }
        }
    }
    out
}

/// One-line summary of a created or updated record.
pub fn format_record_summary(action: &str, record: &serde_json::Map<String, serde_json::Value>) -> String {
    let id = record
        .get("id")
        .map(crate::item::sanitize)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    format!("{} {}", action.green(), id.cyan())
}
