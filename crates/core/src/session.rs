//! Orchestration of planning, traffic, geocoding and live tracking.
//!
//! Network work never holds the tracker lock, so fixes keep flowing while a
//! route is being planned. Planning and geocoding draw tokens from separate
//! generations; a result is only applied if no newer call of the same kind
//! (or [`NavigationSession::cancel`]) happened in the meantime.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use moped_nav_routing::geocode::Suggestion;
use moped_nav_routing::network::DataFetcher;
use moped_nav_routing::{
    Coordinate, GeocoderChain, Incident, ProviderChain, ProviderConfig, Route, VehicleClass,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{NavigationError, Result};
use crate::navigation::{NavigationState, Tracker, TrackerPhase};
use crate::presentation::Presenter;
use crate::sensor::{PositionFix, SensorFeed, Subscription};

/// Monotonic token source; an issued token stays current until the next bump
#[derive(Default)]
struct Generation(AtomicU64);

impl Generation {
    fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    fn ensure(&self, issued: u64) -> Result<()> {
        let current = self.current();
        if issued == current {
            Ok(())
        } else {
            debug!(issued, current, "discarding superseded result");
            Err(NavigationError::StaleGeneration { issued, current })
        }
    }
}

pub struct NavigationSession {
    providers: ProviderChain,
    geocoders: GeocoderChain,
    presenter: Arc<dyn Presenter>,
    tracker: RwLock<Tracker>,
    incidents: RwLock<Vec<Incident>>,
    /// Bumped by `plan_route`, `plan_to_address` and `cancel`
    route_generation: Generation,
    /// Bumped by `geocode` and `cancel`
    geocode_generation: Generation,
}

impl NavigationSession {
    pub fn new(
        providers: ProviderChain,
        geocoders: GeocoderChain,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            providers,
            geocoders,
            presenter,
            tracker: RwLock::new(Tracker::new()),
            incidents: RwLock::new(Vec::new()),
            route_generation: Generation::default(),
            geocode_generation: Generation::default(),
        }
    }

    pub fn from_config(
        config: &ProviderConfig,
        fetcher: Arc<dyn DataFetcher>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self::new(
            ProviderChain::from_config(config, Arc::clone(&fetcher)),
            GeocoderChain::from_config(config, fetcher),
            presenter,
        )
    }

    // ------------------------------------------------------------------------
    // Generations
    // ------------------------------------------------------------------------

    pub fn route_generation(&self) -> u64 {
        self.route_generation.current()
    }

    pub fn geocode_generation(&self) -> u64 {
        self.geocode_generation.current()
    }

    // ------------------------------------------------------------------------
    // Planning
    // ------------------------------------------------------------------------

    /// Plan and install a route. Superseded calls return `StaleGeneration`
    /// and leave the session untouched.
    pub async fn plan_route(
        &self,
        start: Coordinate,
        end: Coordinate,
        class: VehicleClass,
    ) -> Result<Arc<Route>> {
        let generation = self.route_generation.next();
        self.plan_route_as(generation, start, end, class).await
    }

    /// Plan from the last known position fix
    pub async fn plan_from_current_position(
        &self,
        end: Coordinate,
        class: VehicleClass,
    ) -> Result<Arc<Route>> {
        let start = self
            .tracker
            .read()
            .await
            .last_fix()
            .ok_or(NavigationError::SensorUnavailable)?;

        self.plan_route(start.coordinate, end, class).await
    }

    /// Geocode `destination` and plan towards it
    pub async fn plan_to_address(
        &self,
        start: Coordinate,
        destination: &str,
        class: VehicleClass,
    ) -> Result<Arc<Route>> {
        let generation = self.route_generation.next();
        let end = self.geocoders.geocode(destination).await;
        self.route_generation.ensure(generation)?;

        self.plan_route_as(generation, start, end?, class).await
    }

    async fn plan_route_as(
        &self,
        generation: u64,
        start: Coordinate,
        end: Coordinate,
        class: VehicleClass,
    ) -> Result<Arc<Route>> {
        let planned = self.providers.plan_route(start, end, class).await;
        self.route_generation.ensure(generation)?;
        let route = Arc::new(planned?);

        {
            let mut tracker = self.tracker.write().await;
            // checked again under the lock so a concurrent cancel cannot interleave
            self.route_generation.ensure(generation)?;

            let state = tracker.load_route(Arc::clone(&route));
            self.incidents.write().await.clear();

            self.presenter.render_route(&route);
            self.presenter.render_incidents(&[]);
            if let Some(state) = state {
                self.presenter.render_navigation(&state);
            }
        }
        info!(generation, provider = %route.provider(), "route installed");

        if self.providers.supports_traffic(&route) {
            self.refresh_incidents_as(generation, &route).await?;
        }

        Ok(route)
    }

    async fn refresh_incidents_as(&self, generation: u64, route: &Route) -> Result<()> {
        let incidents = match self.providers.fetch_incidents(route).await {
            Ok(incidents) => incidents,
            Err(e) => {
                warn!(error = %e, "incident lookup failed");
                Vec::new()
            }
        };

        let mut current = self.incidents.write().await;
        self.route_generation.ensure(generation)?;

        debug!(count = incidents.len(), "incidents updated");
        self.presenter.render_incidents(&incidents);
        *current = incidents;

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Geocoding
    // ------------------------------------------------------------------------

    pub async fn geocode(&self, query: &str) -> Result<Coordinate> {
        let generation = self.geocode_generation.next();
        let result = self.geocoders.geocode(query).await;
        self.geocode_generation.ensure(generation)?;

        Ok(result?)
    }

    /// Autocomplete; not generation-tagged since it changes no session state
    pub async fn suggest(&self, query: &str) -> Vec<Suggestion> {
        self.geocoders.suggest(query).await
    }

    // ------------------------------------------------------------------------
    // Tracking
    // ------------------------------------------------------------------------

    pub async fn start_navigation(&self) -> Result<()> {
        let mut tracker = self.tracker.write().await;

        if let Some(state) = tracker.start()? {
            self.presenter.render_navigation(&state);
        }
        info!("navigation started");

        Ok(())
    }

    /// Back to Idle, keeping the route on screen
    pub async fn stop_navigation(&self) {
        self.tracker.write().await.cancel();
    }

    /// Supersede in-flight work and drop route, incidents and guidance
    pub async fn cancel(&self) {
        let generation = self.route_generation.next();
        self.geocode_generation.next();

        let mut tracker = self.tracker.write().await;
        tracker.reset();
        self.incidents.write().await.clear();
        self.presenter.clear();
        drop(tracker);

        debug!(generation, "session cancelled");
    }

    /// Renders under the tracker lock so a concurrent cancel cannot be
    /// followed by guidance for the dropped route
    pub async fn on_fix(&self, fix: PositionFix) -> Option<NavigationState> {
        let mut tracker = self.tracker.write().await;
        let state = tracker.on_fix(fix)?;
        self.presenter.render_navigation(&state);
        Some(state)
    }

    /// Feed every fix from `feed` into this session
    pub fn follow(self: &Arc<Self>, feed: &SensorFeed) -> Subscription {
        let session = Arc::clone(self);

        feed.subscribe(move |fix| {
            let session = Arc::clone(&session);
            async move {
                session.on_fix(fix).await;
            }
        })
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub async fn route(&self) -> Option<Arc<Route>> {
        self.tracker.read().await.route().cloned()
    }

    pub async fn state(&self) -> Option<NavigationState> {
        self.tracker.read().await.state().cloned()
    }

    pub async fn phase(&self) -> TrackerPhase {
        self.tracker.read().await.phase()
    }

    pub async fn incidents(&self) -> Vec<Incident> {
        self.incidents.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock, Weak};

    use moped_nav_routing::geo;
    use moped_nav_routing::{
        BoxFuture, Geocoder, IncidentIdentifier, IncidentKind, IncidentSource, ProviderIdentifier,
        RouteRequest, RoutingError, RoutingProvider,
    };

    use crate::presentation::NoopPresenter;
    use tokio::sync::Notify;

    const START: Coordinate = Coordinate::new(51.0543, 3.7174);
    const SLOW_END: Coordinate = Coordinate::new(51.0, 3.8);
    const FAST_END: Coordinate = Coordinate::new(50.9, 3.9);

    /// Straight two-point routes; requests towards `SLOW_END` wait for `release`,
    /// as do incident lookups when `gate_incidents` is set
    struct GatedProvider {
        id: ProviderIdentifier,
        traffic: bool,
        gate_incidents: bool,
        entered: Notify,
        release: Notify,
    }

    impl GatedProvider {
        fn new(traffic: bool) -> Arc<Self> {
            Arc::new(Self {
                id: ProviderIdentifier::new("gated"),
                traffic,
                gate_incidents: false,
                entered: Notify::new(),
                release: Notify::new(),
            })
        }

        fn with_gated_incidents() -> Arc<Self> {
            Arc::new(Self {
                id: ProviderIdentifier::new("gated"),
                traffic: true,
                gate_incidents: true,
                entered: Notify::new(),
                release: Notify::new(),
            })
        }
    }

    impl RoutingProvider for GatedProvider {
        fn id(&self) -> &ProviderIdentifier {
            &self.id
        }

        fn supports_traffic(&self) -> bool {
            self.traffic
        }

        fn plan<'a>(
            &'a self,
            request: &'a RouteRequest,
        ) -> BoxFuture<'a, moped_nav_routing::Result<Route>> {
            Box::pin(async move {
                if request.end == SLOW_END {
                    self.entered.notify_one();
                    self.release.notified().await;
                }
                Route::new(
                    vec![request.start, request.end],
                    vec![],
                    1000.0,
                    120.0,
                    self.id.clone(),
                )
            })
        }

        fn incidents(&self) -> Option<&dyn IncidentSource> {
            Some(self)
        }
    }

    impl IncidentSource for GatedProvider {
        fn fetch_incidents<'a>(
            &'a self,
            bounds: geo::Rect,
        ) -> BoxFuture<'a, moped_nav_routing::Result<Vec<Incident>>> {
            let location = Coordinate::new(bounds.center().y, bounds.center().x);
            Box::pin(async move {
                if self.gate_incidents {
                    self.entered.notify_one();
                    self.release.notified().await;
                }
                Ok(vec![Incident {
                    id: IncidentIdentifier::new("inc-0"),
                    location,
                    kind: IncidentKind::Jam,
                    description: Some("File".into()),
                    magnitude: 2,
                    delay_s: 90,
                }])
            })
        }
    }

    #[derive(Default)]
    struct RecordingPresenter {
        events: Mutex<Vec<String>>,
    }

    impl RecordingPresenter {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl Presenter for RecordingPresenter {
        fn render_route(&self, route: &Route) {
            self.events.lock().unwrap().push(format!("route {}", route.coordinates().len()));
        }

        fn render_incidents(&self, incidents: &[Incident]) {
            self.events.lock().unwrap().push(format!("incidents {}", incidents.len()));
        }

        fn render_navigation(&self, state: &NavigationState) {
            self.events.lock().unwrap().push(format!("navigation {}", state.closest_route_index));
        }

        fn clear(&self) {
            self.events.lock().unwrap().push("clear".into());
        }
    }

    fn session(
        provider: Arc<GatedProvider>,
    ) -> (Arc<NavigationSession>, Arc<RecordingPresenter>) {
        let presenter = Arc::new(RecordingPresenter::default());
        let session = NavigationSession::new(
            ProviderChain::new(vec![provider]),
            GeocoderChain::new(vec![], "BE"),
            presenter.clone(),
        );
        (Arc::new(session), presenter)
    }

    #[tokio::test]
    async fn test_plan_installs_route() {
        let (session, presenter) = session(GatedProvider::new(false));

        let route = session.plan_route(START, FAST_END, VehicleClass::B).await.unwrap();
        assert_eq!(session.route().await.unwrap(), route);
        assert_eq!(session.phase().await, TrackerPhase::Idle);
        assert_eq!(presenter.events(), vec!["route 2", "incidents 0"]);
        assert!(session.incidents().await.is_empty());
    }

    #[tokio::test]
    async fn test_late_result_of_superseded_plan_is_discarded() {
        let provider = GatedProvider::new(false);
        let (session, _) = session(provider.clone());

        let first = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.plan_route(START, SLOW_END, VehicleClass::B).await }
        });
        provider.entered.notified().await;

        let second = session.plan_route(START, FAST_END, VehicleClass::B).await.unwrap();
        provider.release.notify_one();

        let stale = first.await.unwrap();
        assert!(matches!(
            stale,
            Err(NavigationError::StaleGeneration { issued: 1, current: 2 })
        ));
        assert_eq!(session.route().await.unwrap(), second);
        assert_eq!(second.last_coordinate(), FAST_END);
    }

    #[tokio::test]
    async fn test_cancel_discards_in_flight_plan() {
        let provider = GatedProvider::new(false);
        let (session, presenter) = session(provider.clone());

        let pending = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.plan_route(START, SLOW_END, VehicleClass::A).await }
        });
        provider.entered.notified().await;

        session.cancel().await;
        provider.release.notify_one();

        assert!(matches!(pending.await.unwrap(), Err(NavigationError::StaleGeneration { .. })));
        assert!(session.route().await.is_none());
        assert_eq!(presenter.events(), vec!["clear"]);
    }

    #[tokio::test]
    async fn test_traffic_aware_route_fetches_incidents() {
        let (session, presenter) = session(GatedProvider::new(true));

        session.plan_route(START, FAST_END, VehicleClass::B).await.unwrap();

        let incidents = session.incidents().await;
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].kind, IncidentKind::Jam);
        assert_eq!(presenter.events(), vec!["route 2", "incidents 0", "incidents 1"]);
    }

    #[tokio::test]
    async fn test_cancel_discards_pending_incidents() {
        let provider = GatedProvider::with_gated_incidents();
        let (session, presenter) = session(provider.clone());

        let pending = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.plan_route(START, FAST_END, VehicleClass::B).await }
        });
        provider.entered.notified().await;

        session.cancel().await;
        provider.release.notify_one();

        assert!(matches!(
            pending.await.unwrap(),
            Err(NavigationError::StaleGeneration { issued: 1, current: 2 })
        ));
        assert!(session.incidents().await.is_empty());
        assert_eq!(presenter.events(), vec!["route 2", "incidents 0", "clear"]);
    }

    #[tokio::test]
    async fn test_tracking_renders_navigation() {
        let (session, presenter) = session(GatedProvider::new(false));

        assert!(matches!(session.start_navigation().await, Err(NavigationError::NoRoute)));
        assert!(matches!(
            session.plan_from_current_position(FAST_END, VehicleClass::B).await,
            Err(NavigationError::SensorUnavailable)
        ));

        assert_eq!(session.on_fix(PositionFix::at(START)).await, None);
        session.plan_from_current_position(FAST_END, VehicleClass::B).await.unwrap();
        session.start_navigation().await.unwrap();

        assert_eq!(session.phase().await, TrackerPhase::Tracking);
        let state = session.state().await.unwrap();
        assert_eq!(state.closest_route_index, 0);
        assert_eq!(presenter.events().last().unwrap(), "navigation 0");

        session.stop_navigation().await;
        assert_eq!(session.phase().await, TrackerPhase::Idle);
        assert!(session.route().await.is_some());
    }

    #[tokio::test]
    async fn test_follow_feeds_fixes_into_tracker() {
        let (session, _) = session(GatedProvider::new(false));
        session.plan_route(START, FAST_END, VehicleClass::B).await.unwrap();
        session.start_navigation().await.unwrap();

        let feed = SensorFeed::new();
        let subscription = session.follow(&feed);
        feed.publish(PositionFix::new(FAST_END, Some(12.5)));

        let state = loop {
            if let Some(state) = session.state().await {
                break state;
            }
            tokio::task::yield_now().await;
        };
        assert_eq!(state.speed_kph, Some(45));
        subscription.cancel().await;
    }

    struct FixedGeocoder(ProviderIdentifier);

    impl Geocoder for FixedGeocoder {
        fn id(&self) -> &ProviderIdentifier {
            &self.0
        }

        fn geocode<'a>(
            &'a self,
            _query: &'a str,
            _country: &'a str,
        ) -> BoxFuture<'a, moped_nav_routing::Result<Coordinate>> {
            Box::pin(async { Ok(FAST_END) })
        }

        fn suggest<'a>(
            &'a self,
            _query: &'a str,
            _country: &'a str,
            _limit: usize,
        ) -> BoxFuture<'a, moped_nav_routing::Result<Vec<Suggestion>>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    fn fixed_geocoders() -> GeocoderChain {
        GeocoderChain::new(
            vec![Arc::new(FixedGeocoder(ProviderIdentifier::new("fixed")))],
            "BE",
        )
    }

    #[tokio::test]
    async fn test_plan_to_address_geocodes_destination() {
        let session = NavigationSession::new(
            ProviderChain::new(vec![GatedProvider::new(false)]),
            fixed_geocoders(),
            Arc::new(NoopPresenter),
        );

        let route = session
            .plan_to_address(START, "Grote Markt, Brussel", VehicleClass::A)
            .await
            .unwrap();
        assert_eq!(route.last_coordinate(), FAST_END);
        assert_eq!(session.route_generation(), 1);
        assert_eq!(session.geocode_generation(), 0);
    }

    #[tokio::test]
    async fn test_geocode_does_not_supersede_pending_plan() {
        let provider = GatedProvider::new(false);
        let session = Arc::new(NavigationSession::new(
            ProviderChain::new(vec![provider.clone()]),
            fixed_geocoders(),
            Arc::new(NoopPresenter),
        ));

        let pending = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.plan_route(START, SLOW_END, VehicleClass::B).await }
        });
        provider.entered.notified().await;

        assert_eq!(session.geocode("Korenmarkt").await.unwrap(), FAST_END);
        provider.release.notify_one();

        let route = pending.await.unwrap().unwrap();
        assert_eq!(route.last_coordinate(), SLOW_END);
        assert_eq!(session.route().await.unwrap(), route);
        assert_eq!(session.route_generation(), 1);
        assert_eq!(session.geocode_generation(), 1);
    }

    /// Records, for every guidance render, whether the tracker lock was held
    #[derive(Default)]
    struct LockCheckingPresenter {
        session: OnceLock<Weak<NavigationSession>>,
        renders: Mutex<Vec<bool>>,
        cleared: Mutex<bool>,
        rendered_after_clear: Mutex<bool>,
    }

    impl Presenter for LockCheckingPresenter {
        fn render_route(&self, _route: &Route) {}

        fn render_incidents(&self, _incidents: &[Incident]) {}

        fn render_navigation(&self, _state: &NavigationState) {
            if *self.cleared.lock().unwrap() {
                *self.rendered_after_clear.lock().unwrap() = true;
            }
            if let Some(session) = self.session.get().and_then(Weak::upgrade) {
                let locked = session.tracker.try_read().is_err();
                self.renders.lock().unwrap().push(locked);
            }
        }

        fn clear(&self) {
            *self.cleared.lock().unwrap() = true;
        }
    }

    #[tokio::test]
    async fn test_fix_renders_while_tracker_is_locked() {
        let presenter = Arc::new(LockCheckingPresenter::default());
        let session = Arc::new(NavigationSession::new(
            ProviderChain::new(vec![GatedProvider::new(false)]),
            GeocoderChain::new(vec![], "BE"),
            presenter.clone(),
        ));
        presenter.session.set(Arc::downgrade(&session)).unwrap();

        session.plan_route(START, FAST_END, VehicleClass::B).await.unwrap();
        session.start_navigation().await.unwrap();
        assert!(session.on_fix(PositionFix::at(START)).await.is_some());

        let renders = presenter.renders.lock().unwrap().clone();
        assert!(!renders.is_empty());
        assert!(renders.iter().all(|locked| *locked));

        session.cancel().await;
        assert_eq!(session.on_fix(PositionFix::at(FAST_END)).await, None);
        assert!(!*presenter.rendered_after_clear.lock().unwrap());
    }

    #[tokio::test]
    async fn test_geocode_failure_is_reported() {
        let (session, _) = session(GatedProvider::new(false));

        assert!(matches!(
            session.geocode("Korenmarkt").await,
            Err(NavigationError::Routing(RoutingError::GeocodeNotFound(_)))
        ));
        assert!(session.suggest("Ko").await.is_empty());
    }
}
