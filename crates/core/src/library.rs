//! Library view - owns the view state and drives per-page enrichment
//!
//! Network work runs in spawned tasks that hold only the data source and a
//! channel sender. Every task reports back with exactly one event, tagged
//! with the epoch (page state) or generation (library load) it was issued
//! under. Events are applied on the owner's side in `poll_events` /
//! `next_event`, so the view is the only writer of its state and superseded
//! results are dropped on arrival.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::models::{AchievementBadge, AchievementSummary, AppId, CompletionState, DlcBadge, Game, GameDetails, GlobalRarity, Language};
use crate::query::{aggregate_completion, compute_visible_page, total_playtime_hours, FilterMode, PageView, Query, SortMode, ViewState};
use crate::render::{Card, CardHandle, RenderedPage, Renderer};
use crate::sheet::{build_sheet, AchievementSheet};
use crate::source::DataSource;

type Summaries = HashMap<AppId, AchievementSummary>;

enum Event {
    /// Bulk achievement counts for the cards of one page
    Achievements {
        epoch: u64,
        cards: Vec<CardHandle>,
        result: Result<Summaries>,
    },
    Dlc {
        epoch: u64,
        card: CardHandle,
        result: Result<GameDetails>,
    },
    /// Counts fetched so the completion sort can rank every filtered title
    Backfill {
        generation: u64,
        appids: Vec<AppId>,
        result: Result<Summaries>,
    },
    /// Counts for the whole library, for the completion summary
    Aggregate {
        generation: u64,
        result: Result<Summaries>,
    },
    /// The fetch task panicked; only releases its in-flight slot
    Aborted,
}

pub struct LibraryView<R: Renderer> {
    source: Arc<dyn DataSource>,
    renderer: R,
    state: ViewState,
    language: Language,
    /// Bumped on every library replacement
    generation: u64,
    rarity_cache: HashMap<AppId, GlobalRarity>,
    backfill_requested: HashSet<AppId>,
    events_tx: UnboundedSender<Event>,
    events_rx: UnboundedReceiver<Event>,
    in_flight: usize,
}

impl<R: Renderer> LibraryView<R> {
    pub fn new(source: Arc<dyn DataSource>, renderer: R) -> Self {
        let (events_tx, events_rx) = unbounded_channel();
        Self {
            source,
            renderer,
            state: ViewState::default(),
            language: Language::default(),
            generation: 0,
            rarity_cache: HashMap::new(),
            backfill_requested: HashSet::new(),
            events_tx,
            events_rx,
            in_flight: 0,
        }
    }

    /// Set the initial query without rendering
    pub fn with_query(mut self, query: Query) -> Self {
        self.state.filter = query.filter;
        self.state.sort = query.sort;
        self.state.search = query.search;
        self.state.page_size = query.page_size.max(1);
        self.state.current_page = query.page;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn epoch(&self) -> u64 {
        self.state.epoch
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Change the language used for achievement sheets opened from now on
    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    /// Number of spawned requests whose event has not been applied yet
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn percent(&self, appid: &AppId) -> u8 {
        self.state.percent(appid)
    }

    pub fn total_playtime_hours(&self) -> u64 {
        total_playtime_hours(&self.state.all_games)
    }

    pub fn game(&self, appid: &AppId) -> Option<&Game> {
        self.state.all_games.iter().find(|g| &g.appid == appid)
    }

    // ========================================================================
    // Library
    // ========================================================================

    /// Replace the library. The achievement cache is kept so titles that
    /// were already enriched show their progress immediately.
    pub fn set_games(&mut self, games: Vec<Game>) {
        self.generation += 1;
        self.state.all_games = games;
        self.state.current_page = 0;
        self.backfill_requested.clear();

        let hours = total_playtime_hours(&self.state.all_games);
        self.renderer.total_playtime(hours);
        debug!(games = self.state.all_games.len(), hours, "Library replaced");
    }

    /// Fetch the library, show the first page and start the completion summary.
    ///
    /// On failure nothing of the library is shown and the renderer gets the error.
    pub async fn load_library(&mut self) -> Result<usize> {
        self.renderer.library_loading();
        self.renderer.completion_summary(&CompletionState::Loading);

        match self.source.games_summary().await {
            Ok(games) => {
                let count = games.len();
                self.set_games(games);
                self.refresh();
                self.start_completion_summary();
                Ok(count)
            }
            Err(e) => {
                warn!("Failed to load library: {}", e);
                self.generation += 1;
                self.state.epoch += 1;
                self.state.all_games.clear();
                self.state.current_page = 0;
                self.renderer.library_failed(&e);
                self.renderer.completion_summary(&CompletionState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    // ========================================================================
    // Query
    // ========================================================================

    /// Pure computation of the current page
    pub fn visible_page(&self) -> PageView {
        compute_visible_page(&self.state)
    }

    /// Apply a new query and re-render. Identical queries are ignored.
    ///
    /// A changed search term always starts over at page 0.
    pub fn set_query(&mut self, query: Query) -> bool {
        let query = Query {
            page_size: query.page_size.max(1),
            ..query
        };
        if query == self.state.query() {
            return false;
        }

        let search_changed = query.search != self.state.search;
        self.state.filter = query.filter;
        self.state.sort = query.sort;
        self.state.search = query.search;
        self.state.page_size = query.page_size;
        self.state.current_page = if search_changed { 0 } else { query.page };

        self.refresh();
        true
    }

    pub fn set_search(&mut self, search: impl Into<String>) -> bool {
        let query = Query {
            search: search.into(),
            ..self.state.query()
        };
        self.set_query(query)
    }

    pub fn set_filter(&mut self, filter: FilterMode) -> bool {
        let query = Query { filter, ..self.state.query() };
        self.set_query(query)
    }

    pub fn set_sort(&mut self, sort: SortMode) -> bool {
        let query = Query { sort, ..self.state.query() };
        self.set_query(query)
    }

    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        let query = Query { page_size, ..self.state.query() };
        self.set_query(query)
    }

    pub fn go_to_page(&mut self, page: usize) -> bool {
        let query = Query { page, ..self.state.query() };
        self.set_query(query)
    }

    pub fn next_page(&mut self) -> bool {
        let view = self.visible_page();
        if view.page_index + 1 >= view.page_count {
            return false;
        }
        self.go_to_page(view.page_index + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        let page = self.visible_page().page_index;
        if page == 0 {
            return false;
        }
        self.go_to_page(page - 1)
    }

    /// Recompute the page, hand it to the renderer and enrich it.
    ///
    /// Under the completion sort, titles ranked without data are fetched in
    /// the background and the page is rendered again (same page index) once
    /// they arrive.
    pub fn refresh(&mut self) -> RenderedPage {
        let view = compute_visible_page(&self.state);
        self.state.current_page = view.page_index;

        let cards = view
            .items
            .into_iter()
            .enumerate()
            .map(|(slot, game)| {
                let cached = self.state.achievement_cache.get(&game.appid);
                Card::new(slot, game, cached)
            })
            .collect();
        let page = RenderedPage {
            cards,
            page_index: view.page_index,
            page_count: view.page_count,
            filtered_count: view.filtered_count,
        };

        self.renderer.render_page(&page);
        self.enrich(&page.handles());

        let missing: Vec<AppId> = view
            .missing_summaries
            .into_iter()
            .filter(|id| self.backfill_requested.insert(id.clone()))
            .collect();
        if !missing.is_empty() {
            self.start_backfill(missing);
        }

        page
    }

    // ========================================================================
    // Enrichment
    // ========================================================================

    fn spawn_fetch<F>(&mut self, fetch: F)
    where
        F: Future<Output = Event> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let event = match tokio::spawn(fetch).await {
                Ok(event) => event,
                Err(e) => {
                    warn!("Fetch task did not complete: {}", e);
                    Event::Aborted
                }
            };
            // The receiver lives as long as the view
            let _ = tx.send(event);
        });
    }

    /// Start fetching achievements (one batch) and DLC (one request per card)
    /// for the given cards. Supersedes all earlier enrichment.
    pub fn enrich(&mut self, cards: &[CardHandle]) -> u64 {
        self.state.epoch += 1;
        let epoch = self.state.epoch;
        if cards.is_empty() {
            return epoch;
        }
        debug!(epoch, cards = cards.len(), "Enriching page");

        let source = Arc::clone(&self.source);
        let batch = cards.to_vec();
        self.spawn_fetch(async move {
            let appids: Vec<AppId> = batch.iter().map(|c| c.appid.clone()).collect();
            let result = source.achievements_bulk(&appids).await;
            Event::Achievements { epoch, cards: batch, result }
        });

        for card in cards {
            let source = Arc::clone(&self.source);
            let card = card.clone();
            self.spawn_fetch(async move {
                let result = source.game_details(&card.appid).await;
                Event::Dlc { epoch, card, result }
            });
        }

        epoch
    }

    fn start_backfill(&mut self, appids: Vec<AppId>) {
        debug!(count = appids.len(), "Backfilling achievement counts for completion sort");
        let generation = self.generation;
        let source = Arc::clone(&self.source);
        self.spawn_fetch(async move {
            let result = source.achievements_bulk(&appids).await;
            Event::Backfill { generation, appids, result }
        });
    }

    /// Fetch counts for the whole library in the background; the renderer
    /// receives the summary when it resolves.
    pub fn start_completion_summary(&mut self) {
        self.renderer.completion_summary(&CompletionState::Loading);
        if self.state.all_games.is_empty() {
            self.renderer.completion_summary(&CompletionState::NotApplicable);
            return;
        }

        let generation = self.generation;
        let appids = self.library_appids();
        let source = Arc::clone(&self.source);
        self.spawn_fetch(async move {
            let result = source.achievements_bulk(&appids).await;
            Event::Aggregate { generation, result }
        });
    }

    /// Fetch counts for the whole library and report the average completion.
    pub async fn completion_summary(&mut self) -> CompletionState {
        self.renderer.completion_summary(&CompletionState::Loading);
        let appids = self.library_appids();
        let state = if appids.is_empty() {
            CompletionState::NotApplicable
        } else {
            let result = self.source.achievements_bulk(&appids).await;
            self.finish_completion_summary(result)
        };
        self.renderer.completion_summary(&state);
        state
    }

    fn library_appids(&self) -> Vec<AppId> {
        self.state.all_games.iter().map(|g| g.appid.clone()).collect()
    }

    fn finish_completion_summary(&mut self, result: Result<Summaries>) -> CompletionState {
        match result {
            Ok(summaries) => {
                let state = match aggregate_completion(
                    self.state.all_games.iter().filter_map(|g| summaries.get(&g.appid)),
                ) {
                    Some(summary) => CompletionState::Ready(summary),
                    None => CompletionState::NotApplicable,
                };
                self.state.achievement_cache.extend(summaries);
                state
            }
            Err(e) => {
                warn!("Completion summary failed: {}", e);
                CompletionState::Failed(e.to_string())
            }
        }
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Apply every event that has already arrived. Never blocks.
    pub fn poll_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event);
            applied += 1;
        }
        applied
    }

    /// Wait for the next event and apply it. Returns false if nothing is pending.
    pub async fn next_event(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.events_rx.recv().await {
            Some(event) => {
                self.apply_event(event);
                true
            }
            None => false,
        }
    }

    /// Apply events until no request is outstanding
    pub async fn settle(&mut self) {
        while self.next_event().await {}
    }

    fn apply_event(&mut self, event: Event) {
        self.in_flight = self.in_flight.saturating_sub(1);

        match event {
            Event::Achievements { epoch, cards, result } => {
                if epoch != self.state.epoch {
                    trace!(epoch, current = self.state.epoch, "Dropping stale achievement batch");
                    return;
                }
                match result {
                    Ok(summaries) => {
                        for card in &cards {
                            let badge = match summaries.get(&card.appid) {
                                Some(summary) => {
                                    self.state.achievement_cache.insert(card.appid.clone(), *summary);
                                    AchievementBadge::from_summary(summary)
                                }
                                None => AchievementBadge::NoAchievements,
                            };
                            self.renderer.update_achievement_badge(card, &badge);
                        }
                    }
                    Err(e) => {
                        warn!("Achievement batch failed for {} cards: {}", cards.len(), e);
                        for card in &cards {
                            self.renderer.update_achievement_badge(card, &AchievementBadge::Unknown);
                        }
                    }
                }
            }
            Event::Dlc { epoch, card, result } => {
                if epoch != self.state.epoch {
                    trace!(epoch, appid = %card.appid, "Dropping stale DLC details");
                    return;
                }
                let badge = match result {
                    Ok(details) => details.dlc_badge(),
                    Err(e) => {
                        debug!(appid = %card.appid, "DLC details failed: {}", e);
                        DlcBadge::Unavailable
                    }
                };
                self.renderer.update_dlc_badge(&card, &badge);
            }
            Event::Backfill { generation, appids, result } => {
                if generation != self.generation {
                    trace!(generation, "Dropping backfill for a replaced library");
                    return;
                }
                match result {
                    Ok(summaries) => {
                        self.state.achievement_cache.extend(summaries);
                        if self.state.sort == SortMode::Completion {
                            self.refresh();
                        }
                    }
                    Err(e) => {
                        warn!("Completion sort backfill failed: {}", e);
                        for id in &appids {
                            self.backfill_requested.remove(id);
                        }
                    }
                }
            }
            Event::Aggregate { generation, result } => {
                if generation != self.generation {
                    trace!(generation, "Dropping completion summary for a replaced library");
                    return;
                }
                let state = self.finish_completion_summary(result);
                self.renderer.completion_summary(&state);
            }
            Event::Aborted => {}
        }
    }

    // ========================================================================
    // Achievement sheet
    // ========================================================================

    /// Fetch schema, unlock state and global rarity for one title and join them.
    ///
    /// Only a schema failure is an error; missing unlock state shows every
    /// achievement locked and missing rarity shows no tiers.
    pub async fn open_achievements(&mut self, appid: &AppId) -> Result<AchievementSheet> {
        let title = self
            .game(appid)
            .map(|g| g.name.clone())
            .unwrap_or_else(|| appid.to_string());
        let cached_rarity = self.rarity_cache.get(appid).cloned();
        let source = Arc::clone(&self.source);
        let language = self.language;

        let (schema, player, rarity) = tokio::join!(
            source.schema(appid, language),
            source.player_achievements(appid),
            async {
                match cached_rarity {
                    Some(rarity) => Ok(rarity),
                    None => source.global_rarity(appid).await,
                }
            }
        );

        let schema = schema?;
        let player = player.unwrap_or_else(|e| {
            warn!(appid = %appid, "Player achievements unavailable: {}", e);
            HashMap::new()
        });
        let rarity = match rarity {
            Ok(rarity) => {
                self.rarity_cache.entry(appid.clone()).or_insert_with(|| rarity.clone());
                rarity
            }
            Err(e) => {
                warn!(appid = %appid, "Global rarity unavailable: {}", e);
                GlobalRarity::default()
            }
        };

        debug!(appid = %appid, achievements = schema.len(), language = %language, "Opened achievement sheet");
        Ok(build_sheet(appid.clone(), title, &schema, &player, &rarity))
    }
}
