use tasklist_core::{Category, FilterConfig, FilterPatch, SortKey, StatusFilter, TaskRecord};

/// The part of the filter config the picker edits. Search has its own prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct FilterSelection {
    pub(crate) status: StatusFilter,
    pub(crate) category: Option<Category>,
    pub(crate) sort: SortKey,
}

impl FilterSelection {
    pub(crate) fn from_config(config: &FilterConfig) -> Self {
        Self {
            status: config.status,
            category: config.category,
            sort: config.sort,
        }
    }

    pub(crate) fn into_patch(self) -> FilterPatch {
        FilterPatch {
            status: Some(self.status),
            category: Some(self.category),
            search: None,
            sort: Some(self.sort),
        }
    }
}

/// Short description of every non-default filter, `None` when the config
/// shows everything in the default order.
pub(crate) fn filter_summary(config: &FilterConfig) -> Option<String> {
    let mut parts = Vec::new();
    if config.status != StatusFilter::All {
        parts.push(format!("status:{}", config.status.as_str()));
    }
    if let Some(category) = config.category {
        parts.push(format!("#{category}"));
    }
    if !config.search.is_empty() {
        parts.push(format!("\"{}\"", config.search));
    }
    if config.sort != SortKey::default() {
        parts.push(format!("sort:{}", config.sort.as_str()));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}

/// Per-option counts shown next to each picker entry.
#[derive(Debug, Default)]
pub(crate) struct FilterFacets {
    pub(crate) active: usize,
    pub(crate) completed: usize,
    pub(crate) categories: [usize; 5],
}

impl FilterFacets {
    pub(crate) fn from_tasks(tasks: &[TaskRecord]) -> Self {
        let mut facets = Self::default();
        for task in tasks {
            if task.completed {
                facets.completed += 1;
            } else {
                facets.active += 1;
            }
            if let Some(idx) = Category::ALL.iter().position(|c| *c == task.category) {
                facets.categories[idx] += 1;
            }
        }
        facets
    }

    pub(crate) fn status_count(&self, status: StatusFilter) -> usize {
        match status {
            StatusFilter::All => self.active + self.completed,
            StatusFilter::Active => self.active,
            StatusFilter::Completed => self.completed,
        }
    }

    pub(crate) fn category_count(&self, category: Category) -> usize {
        Category::ALL
            .iter()
            .position(|c| *c == category)
            .map(|idx| self.categories[idx])
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FilterColumn {
    Status,
    Category,
    Sort,
}

impl FilterColumn {
    pub(crate) const ALL: [Self; 3] = [
        FilterColumn::Status,
        FilterColumn::Category,
        FilterColumn::Sort,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            FilterColumn::Status => 0,
            FilterColumn::Category => 1,
            FilterColumn::Sort => 2,
        }
    }

    pub(crate) fn title(self) -> &'static str {
        match self {
            FilterColumn::Status => "Status",
            FilterColumn::Category => "Category",
            FilterColumn::Sort => "Sort by",
        }
    }

    fn len(self) -> usize {
        match self {
            FilterColumn::Status => StatusFilter::ALL.len(),
            FilterColumn::Category => 1 + Category::ALL.len(),
            FilterColumn::Sort => SortKey::ALL.len(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct FilterOverlay {
    pub(crate) facets: FilterFacets,
    pub(crate) working: FilterSelection,
    pub(crate) initial: FilterSelection,
    pub(crate) column: FilterColumn,
    pub(crate) row_positions: [usize; 3],
}

impl FilterOverlay {
    pub(crate) fn new(facets: FilterFacets, active: FilterSelection) -> Self {
        let mut overlay = Self {
            facets,
            working: active,
            initial: active,
            column: FilterColumn::Status,
            row_positions: [0; 3],
        };
        overlay.point_rows_at_selection();
        overlay
    }

    pub(crate) fn next_column(&mut self) {
        let next = (self.column.index() + 1) % FilterColumn::ALL.len();
        self.column = FilterColumn::ALL[next];
    }

    pub(crate) fn prev_column(&mut self) {
        let idx = self.column.index();
        let prev = if idx == 0 {
            FilterColumn::ALL.len() - 1
        } else {
            idx - 1
        };
        self.column = FilterColumn::ALL[prev];
    }

    pub(crate) fn next_row(&mut self) {
        let max = self.column.len() - 1;
        let row = &mut self.row_positions[self.column.index()];
        *row = if *row >= max { 0 } else { *row + 1 };
    }

    pub(crate) fn prev_row(&mut self) {
        let max = self.column.len() - 1;
        let row = &mut self.row_positions[self.column.index()];
        *row = if *row == 0 { max } else { *row - 1 };
    }

    /// Select the option under the cursor. Status and sort are single
    /// choice; selecting the active category again falls back to all.
    pub(crate) fn toggle_current(&mut self) {
        let row = self.row_positions[self.column.index()];
        match self.column {
            FilterColumn::Status => {
                if let Some(status) = StatusFilter::ALL.get(row) {
                    self.working.status = *status;
                }
            }
            FilterColumn::Category => {
                if row == 0 {
                    self.working.category = None;
                } else if let Some(category) = Category::ALL.get(row - 1) {
                    if self.working.category == Some(*category) {
                        self.working.category = None;
                    } else {
                        self.working.category = Some(*category);
                    }
                }
            }
            FilterColumn::Sort => {
                if let Some(sort) = SortKey::ALL.get(row) {
                    self.working.sort = *sort;
                }
            }
        }
    }

    pub(crate) fn clear_all(&mut self) {
        self.working = FilterSelection::default();
        self.point_rows_at_selection();
    }

    pub(crate) fn cancel(self) -> FilterSelection {
        self.initial
    }

    pub(crate) fn commit(self) -> FilterSelection {
        self.working
    }

    fn point_rows_at_selection(&mut self) {
        self.row_positions = [
            StatusFilter::ALL
                .iter()
                .position(|s| *s == self.working.status)
                .unwrap_or(0),
            self.working
                .category
                .and_then(|c| Category::ALL.iter().position(|other| *other == c))
                .map(|idx| idx + 1)
                .unwrap_or(0),
            SortKey::ALL
                .iter()
                .position(|s| *s == self.working.sort)
                .unwrap_or(0),
        ];
    }
}
