use super::*;

const ORIGIN: Coordinate = Coordinate {
    lat: -37.8136,
    lng: 144.9631,
};

fn spot(id: &str, status: &str, lat: f64, rule: Option<&str>) -> ParkingSpot {
    let restrictions = rule
        .map(|r| {
            vec![crate::spot::Restriction {
                days: "Mon,Tue,Wed,Thu,Fri".to_string(),
                start_time: "07:30:00".to_string(),
                end_time: "18:30:00".to_string(),
                rule: r.to_string(),
            }]
        })
        .unwrap_or_default();
    ParkingSpot {
        id: id.to_string(),
        status: status.to_string(),
        lat,
        lng: 144.9631,
        zone: None,
        last_updated: None,
        status_timestamp: None,
        restrictions,
        current_restriction: None,
        primary_rule: rule.unwrap_or_default().to_string(),
    }
}

/// Three spots at increasing distance south of the origin, listed far-first.
fn feed() -> Vec<ParkingSpot> {
    vec![
        spot("far", "Present", -37.8300, Some("2P")),
        spot("mid", "Unoccupied", -37.8200, Some("LZ30")),
        spot("near", "Present", -37.8140, None),
    ]
}

fn ids(order: &[RankedSpot]) -> Vec<String> {
    order.iter().map(|r| r.spot.id.clone()).collect()
}

#[test]
fn first_call_ranks_and_locks() {
    let mut stabilizer = ResultStabilizer::new();
    let order = ids(stabilizer.compute_order(&feed(), Some(ORIGIN)));
    assert_eq!(order, vec!["near", "mid", "far"]);
    assert!(stabilizer.is_locked());
    assert_eq!(stabilizer.closest_id(), Some("near"));
    assert!(stabilizer.locked_order()[0].is_closest);
}

#[test]
fn same_spots_keep_order_while_status_changes() {
    let mut stabilizer = ResultStabilizer::new();
    let first = ids(stabilizer.compute_order(&feed(), Some(ORIGIN)));

    let mut refreshed = feed();
    refreshed[0].status = "Unoccupied".to_string();
    refreshed[2].status = "Unoccupied".to_string();
    let second = stabilizer.compute_order(&refreshed, Some(ORIGIN));

    assert_eq!(ids(second), first);
    // Positions stay put but the cards show live status.
    let far = second.iter().find(|r| r.spot.id == "far").unwrap();
    assert_eq!(far.spot.status, "Unoccupied");
    assert_eq!(far.original_index, 2);
}

#[test]
fn reordered_input_with_same_spots_returns_locked_order() {
    let mut stabilizer = ResultStabilizer::new();
    let first = ids(stabilizer.compute_order(&feed(), Some(ORIGIN)));

    let mut shuffled = feed();
    shuffled.reverse();
    let second = ids(stabilizer.compute_order(&shuffled, Some(ORIGIN)));
    shuffled.swap(0, 1);
    let third = ids(stabilizer.compute_order(&shuffled, Some(ORIGIN)));

    assert_eq!(second, first);
    assert_eq!(third, first);
}

#[test]
fn same_count_but_different_spots_relocks() {
    let mut stabilizer = ResultStabilizer::new();
    stabilizer.compute_order(&feed(), Some(ORIGIN));

    let mut replaced = feed();
    replaced[2] = spot("other", "Present", -37.8500, None);
    let order = ids(stabilizer.compute_order(&replaced, Some(ORIGIN)));

    assert_eq!(order, vec!["mid", "far", "other"]);
    assert_eq!(stabilizer.closest_id(), Some("mid"));
}

#[test]
fn repeated_ids_with_different_counts_relock() {
    let mut stabilizer = ResultStabilizer::new();
    let a = spot("a", "Present", -37.8140, None);
    let b = spot("b", "Present", -37.8200, None);
    stabilizer.compute_order(&[a.clone(), a.clone(), b.clone()], Some(ORIGIN));

    let mut a_free = a.clone();
    a_free.status = "Unoccupied".to_string();
    let order = ids(stabilizer.compute_order(&[a_free, b.clone(), b], Some(ORIGIN)));

    assert_eq!(order, vec!["a", "b", "b"]);
    assert_eq!(stabilizer.locked_order()[0].spot.status, "Unoccupied");
}

#[test]
fn repeated_ids_refresh_by_occurrence() {
    let mut stabilizer = ResultStabilizer::new();
    let near = spot("dup", "Present", -37.8140, None);
    let far = spot("dup", "Present", -37.8300, None);
    stabilizer.compute_order(&[far.clone(), near.clone()], Some(ORIGIN));

    let mut far_free = far;
    far_free.status = "Unoccupied".to_string();
    let order = stabilizer.compute_order(&[far_free, near], Some(ORIGIN));

    // Locked as [near (input 1), far (input 0)]; each keeps its own payload.
    assert_eq!(order[0].original_index, 1);
    assert_eq!(order[0].spot.status, "Present");
    assert_eq!(order[1].original_index, 0);
    assert_eq!(order[1].spot.status, "Unoccupied");
    assert!((order[1].spot.lat - (-37.8300)).abs() < 1e-9);
}

#[test]
fn added_spot_relocks() {
    let mut stabilizer = ResultStabilizer::new();
    stabilizer.compute_order(&feed(), Some(ORIGIN));

    let mut grown = feed();
    grown.push(spot("here", "Unoccupied", -37.8136, None));
    let order = ids(stabilizer.compute_order(&grown, Some(ORIGIN)));

    assert_eq!(order, vec!["here", "near", "mid", "far"]);
}

#[test]
fn origin_change_relocks() {
    let mut stabilizer = ResultStabilizer::new();
    stabilizer.compute_order(&feed(), Some(ORIGIN));

    let south = Coordinate::new(-37.8300, 144.9631);
    let order = ids(stabilizer.compute_order(&feed(), Some(south)));
    assert_eq!(order, vec!["far", "mid", "near"]);
    assert_eq!(stabilizer.closest_id(), Some("far"));
}

#[test]
fn new_search_relocks_even_with_same_inputs() {
    let mut stabilizer = ResultStabilizer::new();
    let first_token = stabilizer.begin_search();
    stabilizer.compute_order(&feed(), None);

    let second_token = stabilizer.begin_search();
    assert_ne!(first_token, second_token);
    assert!(!stabilizer.is_locked());

    let order = ids(stabilizer.compute_order(&feed(), Some(ORIGIN)));
    assert_eq!(order, vec!["near", "mid", "far"]);
}

#[test]
fn without_origin_keeps_input_order_and_no_distance() {
    let mut stabilizer = ResultStabilizer::new();
    let order = stabilizer.compute_order(&feed(), None);

    assert_eq!(ids(order), vec!["far", "mid", "near"]);
    assert!(order.iter().all(|r| r.distance_meters == 0));
    assert!(order.iter().all(|r| r.formatted_distance.is_empty()));
    assert!(order.iter().all(|r| !r.is_closest));
    assert_eq!(
        order.iter().map(|r| r.original_index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert_eq!(stabilizer.closest_id(), None);
}

#[test]
fn empty_input_resets_session_and_filter() {
    let mut stabilizer = ResultStabilizer::new();
    stabilizer.compute_order(&feed(), Some(ORIGIN));
    stabilizer.select_filter(SpotCategory::TwoHour);

    assert!(stabilizer.compute_order(&[], Some(ORIGIN)).is_empty());
    assert!(!stabilizer.is_locked());
    assert_eq!(stabilizer.closest_id(), None);
    assert_eq!(stabilizer.active_filter(), SpotCategory::All);
}

#[test]
fn filter_selection_toggles_and_keeps_locked_order() {
    let mut stabilizer = ResultStabilizer::new();
    stabilizer.compute_order(&feed(), Some(ORIGIN));

    assert_eq!(stabilizer.select_filter(SpotCategory::NoRestrictions), SpotCategory::NoRestrictions);
    let visible: Vec<&str> = stabilizer.visible().into_iter().map(RankedSpot::id).collect();
    assert_eq!(visible, vec!["near"]);

    assert_eq!(stabilizer.select_filter(SpotCategory::NoRestrictions), SpotCategory::All);
    let visible: Vec<&str> = stabilizer.visible().into_iter().map(RankedSpot::id).collect();
    assert_eq!(visible, vec!["near", "mid", "far"]);

    // Filtering never touches the locked order itself.
    assert_eq!(ids(stabilizer.locked_order()), vec!["near", "mid", "far"]);
}

#[test]
fn filter_counts_cover_locked_order() {
    let mut stabilizer = ResultStabilizer::new();
    stabilizer.compute_order(&feed(), Some(ORIGIN));
    let counts = stabilizer.filter_counts();
    assert_eq!(counts.all, 3);
    assert_eq!(counts.two_hour, 1);
    assert_eq!(counts.no_restrictions, 1);
}
