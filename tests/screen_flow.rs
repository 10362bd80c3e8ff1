use markmap::config::{DEFAULT_LOCATION, DEFAULT_ZOOM, KnownPlace, ScreenConfig};
use markmap::marker::{UNKNOWN_ADDRESS, UNKNOWN_PLACE};
use markmap::platform::{Address, LatLng, Priority};
use markmap::screen::{LocationState, MapScreen, ScreenEvent};
use markmap::sim::SimPlatform;

fn opera_house() -> KnownPlace {
    KnownPlace {
        latitude: -33.8567844,
        longitude: 151.213108,
        address: Address {
            address_lines: vec!["Bennelong Point, Sydney NSW 2000, Australia".to_string()],
            feature_name: Some("Sydney Opera House".to_string()),
        },
    }
}

#[tokio::test]
async fn test_prompt_accepted_then_fix_then_taps() {
    let sim = SimPlatform::new(vec![opera_house()]);
    let config = ScreenConfig::from_yaml(
        "location_request: { priority: high_accuracy, interval_ms: 10000, min_interval_ms: 5000 }",
    )
    .unwrap();
    let (mut screen, mut events) = MapScreen::new(sim.platform(), config);

    screen.handle(ScreenEvent::ViewCreated(sim.view())).unwrap();
    screen.handle(ScreenEvent::MapReady(sim.map())).unwrap();
    assert_eq!(screen.location_state(), LocationState::AwaitingPermission);

    screen.settle(&mut events).await.unwrap();
    assert_eq!(sim.permission_prompts(), 1);
    assert_eq!(screen.location_state(), LocationState::AwaitingFirstFix);
    let request = sim.location_request().unwrap();
    assert_eq!(request.priority, Priority::HighAccuracy);
    assert_eq!(request.min_interval.map(|d| d.as_millis()), Some(5000));

    assert!(sim.deliver_fix(LatLng::new(10.0, 20.0)));
    screen.settle(&mut events).await.unwrap();
    assert!(!sim.deliver_fix(LatLng::new(11.0, 21.0)));
    assert_eq!(
        sim.map_state().camera,
        Some((LatLng::new(10.0, 20.0), DEFAULT_ZOOM))
    );

    screen
        .handle(ScreenEvent::MapTapped(opera_house().position()))
        .unwrap();
    screen
        .handle(ScreenEvent::MapTapped(LatLng::new(0.5, 0.5)))
        .unwrap();
    screen.settle(&mut events).await.unwrap();

    let rows = sim.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0].lines(),
        [
            "Latitude: -33.8567844",
            "Longitude: 151.213108",
            "Address: Bennelong Point, Sydney NSW 2000, Australia",
        ]
    );
    assert_eq!(rows[1].address, format!("Address: {UNKNOWN_ADDRESS}"));
    assert_eq!(sim.label(), UNKNOWN_PLACE);
}

#[tokio::test]
async fn test_many_taps_keep_order_through_run_loop() {
    let sim = SimPlatform::new(vec![opera_house()]).with_permission(true);
    let (screen, events) = MapScreen::new(sim.platform(), ScreenConfig::default());
    let sink = screen.sink();

    let taps: Vec<LatLng> = (0..25)
        .map(|n| LatLng::new(f64::from(n) / 10.0, f64::from(n) / 5.0))
        .collect();

    sink.send(ScreenEvent::ViewCreated(sim.view()));
    sink.send(ScreenEvent::MapReady(sim.map()));
    for at in &taps {
        sink.send(ScreenEvent::MapTapped(*at));
    }
    sink.send(ScreenEvent::Close);

    let markers = tokio::spawn(screen.run(events)).await.unwrap().unwrap();

    let positions: Vec<LatLng> = markers.iter().map(|r| r.position()).collect();
    assert_eq!(positions, taps);
    assert_eq!(sim.rows().len(), taps.len());
    assert_eq!(sim.map_state().markers.len(), taps.len());
}

#[tokio::test]
async fn test_denied_session_degrades_to_default_view() {
    let sim = SimPlatform::new(Vec::new())
        .answer_permission(false)
        .geocoder_offline(true);
    let (mut screen, mut events) = MapScreen::new(sim.platform(), ScreenConfig::default());

    screen.handle(ScreenEvent::ViewCreated(sim.view())).unwrap();
    screen.handle(ScreenEvent::MapReady(sim.map())).unwrap();
    screen.settle(&mut events).await.unwrap();

    assert_eq!(screen.location_state(), LocationState::Denied);
    assert!(!sim.deliver_fix(LatLng::new(10.0, 20.0)));

    // taps still work without location
    screen
        .handle(ScreenEvent::MapTapped(LatLng::new(1.0, 1.0)))
        .unwrap();
    screen.settle(&mut events).await.unwrap();

    let map = sim.map_state();
    assert_eq!(map.camera, Some((DEFAULT_LOCATION, DEFAULT_ZOOM)));
    assert!(!map.my_location_button_enabled);
    assert_eq!(screen.markers().len(), 1);
    assert_eq!(screen.markers()[0].place_name(), UNKNOWN_PLACE);
}

#[tokio::test]
async fn test_reentry_asks_for_permission_again() {
    let sim = SimPlatform::new(Vec::new()).answer_permission(false);
    let (mut screen, mut events) = MapScreen::new(sim.platform(), ScreenConfig::default());

    screen.handle(ScreenEvent::ViewCreated(sim.view())).unwrap();
    screen.settle(&mut events).await.unwrap();
    screen.handle(ScreenEvent::ViewDestroyed).unwrap();
    assert_eq!(screen.location_state(), LocationState::Uninitialized);

    screen.handle(ScreenEvent::ViewCreated(sim.view())).unwrap();
    screen.settle(&mut events).await.unwrap();

    assert_eq!(sim.permission_prompts(), 2);
    assert_eq!(screen.location_state(), LocationState::Denied);
}
