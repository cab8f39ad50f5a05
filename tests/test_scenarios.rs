use hopmesh_scheduler::domain::metrics::metrics_sink::MemorySink;
use hopmesh_scheduler::domain::network::topology::{NetworkTopology, TopologyProvider};
use hopmesh_scheduler::domain::scheduler::hop_aware_scheduler::FramePhase;
use hopmesh_scheduler::domain::scheduler::scheduler_config::SchedulerConfig;
use hopmesh_scheduler::domain::simulator::scenario::Scenario;
use hopmesh_scheduler::domain::traffic::sap_class::SapClass;
use hopmesh_scheduler::domain::traffic::traffic_source::ScriptedTraffic;
use hopmesh_scheduler::domain::utils::id::{ClassId, NodeId};

const CLASS: ClassId = ClassId::new(0);

/// Line 0-1-2-3 with a single class and one slot per node.
fn line_scenario(hop_budget: u32) -> Scenario {
    let class = SapClass::new(CLASS, 0.0, 1.0, 0.5, hop_budget);
    Scenario::new(NetworkTopology::line(4).unwrap(), vec![class], SchedulerConfig { slots_per_node: 1, ..Default::default() })
        .unwrap()
        .with_frames(4)
}

fn single_packet(hop_budget: u32) -> ScriptedTraffic {
    ScriptedTraffic::new().inject(0, NodeId::new(0), NodeId::new(3), CLASS, hop_budget)
}

#[test]
fn test_line_budget_too_small_drops_packet() {
    let scenario = line_scenario(2);
    let mut sink = MemorySink::new();

    let summary = scenario.run_with("budget-2", &mut single_packet(2), &mut sink).unwrap();

    assert_eq!(summary.generated, 1);
    assert_eq!(summary.delivered, 0, "Packet must not reach node 3 with only two hops.");
    assert_eq!(summary.dropped, 1, "Packet must be dropped once its budget is used up.");
    assert_eq!(summary.still_queued, 0);

    // Two hops in frames 0 and 1, dropped at node 2 at the end of frame 1.
    assert_eq!(sink.records[1].classes[&CLASS].dropped, 1);
    assert_eq!(sink.records[2].transmissions, 0);
    assert_eq!(sink.records[3].transmissions, 0);
}

#[test]
fn test_line_exact_budget_delivers_in_three_frames() {
    let scenario = line_scenario(3);
    let nodes: Vec<NodeId> = (0..4).map(NodeId::new).collect();
    assert_eq!(scenario.topology.shortest_hop_path(NodeId::new(0), NodeId::new(3)), nodes.as_slice());

    let mut traffic = single_packet(3);
    let mut driver = scenario.driver();

    let first = driver.step(&mut traffic);
    assert_eq!(first.transmissions, 1);
    assert_eq!(driver.queues().length(NodeId::new(1), CLASS), 1, "Packet should sit at node 1 after frame 0.");
    assert_eq!(driver.phase(), FramePhase::Idle);

    let second = driver.step(&mut traffic);
    assert_eq!(second.transmissions, 1);
    assert_eq!(driver.queues().length(NodeId::new(2), CLASS), 1, "Packet should sit at node 2 after frame 1.");
    assert_eq!(driver.queues().get(NodeId::new(2), CLASS).unwrap().head().unwrap().remaining_hops, 1);

    let third = driver.step(&mut traffic);
    let counts = &third.classes[&CLASS];
    assert_eq!(counts.delivered, 1, "Packet should be delivered during frame 2.");
    assert_eq!(counts.latency_sum, 3, "Packet created at time 0 arrives at time 3.");
    assert_eq!(counts.dropped, 0);
    assert_eq!(driver.queues().total_backlog(), 0);

    let fourth = driver.step(&mut traffic);
    assert_eq!(fourth.total().dropped, 0);
    assert_eq!(fourth.transmissions, 0);
}

#[test]
fn test_packet_injected_at_destination_is_delivered_immediately() {
    let scenario = line_scenario(3);
    let mut traffic = ScriptedTraffic::new().inject(0, NodeId::new(2), NodeId::new(2), CLASS, 3);
    let mut sink = MemorySink::new();

    let summary = scenario.run_with("local", &mut traffic, &mut sink).unwrap();

    assert_eq!(summary.delivered, 1);
    assert_eq!(summary.mean_latency, Some(0.0));
    assert!(sink.records.iter().all(|record| record.transmissions == 0));
}

#[test]
fn test_max_packet_age_expires_blocked_packet() {
    let class = SapClass::new(CLASS, 0.0, 1.0, 0.5, 5);
    let topology = NetworkTopology::from_edges(&[(0, 1), (2, 3)]).unwrap();
    let scenario = Scenario::new(topology, vec![class], SchedulerConfig::default())
        .unwrap()
        .with_frames(6)
        .with_max_packet_age(Some(3));
    let mut traffic = ScriptedTraffic::new().inject(0, NodeId::new(0), NodeId::new(3), CLASS, 5);
    let mut sink = MemorySink::new();

    let summary = scenario.run_with("aged", &mut traffic, &mut sink).unwrap();

    assert_eq!(summary.expired, 1);
    assert_eq!(summary.dropped, 0);
    // Queued during frames 0, 1 and 2, too old at the end of frame 3.
    assert_eq!(sink.records[3].classes[&CLASS].expired, 1);
}

#[test]
fn test_stranded_head_ages_out_and_unblocks_queue() {
    let class = SapClass::new(CLASS, 0.0, 1.0, 0.5, 3);
    let topology = NetworkTopology::from_edges(&[(0, 1), (2, 3)]).unwrap();
    let scenario = Scenario::new(topology, vec![class], SchedulerConfig::default()).unwrap().with_frames(6);

    // Both wait in the queue of node 0: node 3 is out of reach, node 1 is one hop away.
    let mut traffic = ScriptedTraffic::new()
        .inject(0, NodeId::new(0), NodeId::new(3), CLASS, 3)
        .inject(0, NodeId::new(0), NodeId::new(1), CLASS, 3);
    let mut sink = MemorySink::new();

    let summary = scenario.run_with("stranded", &mut traffic, &mut sink).unwrap();

    assert_eq!(summary.dropped, 1, "The stranded packet must run out of hops.");
    assert_eq!(summary.delivered, 1, "The packet queued behind it must still get through.");
    assert_eq!(summary.still_queued, 0);

    // Blocked while the head burns its three hops in frames 0 to 2.
    for record in &sink.records[..3] {
        assert_eq!(record.skipped, 1, "Head should be skipped in frame {}.", record.frame);
        assert_eq!(record.transmissions, 0);
    }
    assert_eq!(sink.records[2].classes[&CLASS].dropped, 1);

    let fourth = &sink.records[3].classes[&CLASS];
    assert_eq!(fourth.delivered, 1);
    assert_eq!(fourth.latency_sum, 4, "Created in frame 0, delivered during frame 3.");
}
