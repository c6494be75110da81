//! Resource Manager Tests
//!
//! Tests for:
//! - Resource deduplication across components
//! - Exactly-once readiness for every completion order
//! - Shared in-flight and already resolved resources
//! - Unknown extensions and late loader registration
//! - Duplicate and dropped completions
//! - Re-adding a component and custom decoded payloads
//! - Scene integration (on_load, update and draw gating)

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use slotmap::SlotMap;

use gloom::assets::{DecodedAsset, LoadRequest, ResourceData, ResourceLoader, ResourceManager};
use gloom::gpu::{DeviceRef, HeadlessDevice};
use gloom::scene::{Component, ComponentKey, ComponentState, FrameContext, Scene};
use gloom::ResourceSlots;

const BASE: &str = "assets/";

/// Loader that holds every request until the test completes it.
#[derive(Clone, Default)]
struct HeldLoads(Arc<Mutex<Vec<LoadRequest>>>);

impl ResourceLoader for HeldLoads {
    fn load(&self, _path: &str, request: LoadRequest) {
        self.0.lock().push(request);
    }
}

impl HeldLoads {
    fn count(&self) -> usize {
        self.0.lock().len()
    }

    fn take(&self, path: &str) -> LoadRequest {
        let mut held = self.0.lock();
        let index = held.iter().position(|r| r.path() == path).unwrap();
        held.remove(index)
    }

    fn complete(&self, path: &str) {
        self.take(path)
            .complete(Some(DecodedAsset::Bytes(path.as_bytes().to_vec())));
    }
}

fn manager_with(extensions: &[&str]) -> (ResourceManager, HeldLoads) {
    let device: DeviceRef = Arc::new(HeadlessDevice::new());
    let mut manager = ResourceManager::new(BASE, device);
    let loads = HeldLoads::default();
    manager.add_loader(extensions, loads.clone());
    (manager, loads)
}

fn keys(n: usize) -> Vec<ComponentKey> {
    let mut map: SlotMap<ComponentKey, ()> = SlotMap::with_key();
    (0..n).map(|_| map.insert(())).collect()
}

fn two_keys() -> (ComponentKey, ComponentKey) {
    let keys = keys(2);
    (keys[0], keys[1])
}

fn slots(files: &[&str]) -> ResourceSlots {
    files
        .iter()
        .enumerate()
        .fold(ResourceSlots::new(), |slots, (i, file)| slots.with(&format!("slot{i}"), file))
}

fn permutations(items: &[usize]) -> Vec<Vec<usize>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let first = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, first);
            out.push(tail);
        }
    }
    out
}

// ============================================================================
// Deduplication
// ============================================================================

#[test]
fn shared_file_is_registered_and_loaded_once() {
    let (mut manager, loads) = manager_with(&["bin"]);
    let (a, b) = two_keys();
    let mut slots_a = slots(&["shared.bin"]);
    let mut slots_b = slots(&["shared.bin"]);

    assert_eq!(manager.add(a, &mut slots_a), 1);
    assert_eq!(manager.add(b, &mut slots_b), 1);

    assert_eq!(manager.resource_count(), 1);
    assert_eq!(loads.count(), 1);
    assert!(Arc::ptr_eq(
        slots_a.get("slot0").unwrap(),
        slots_b.get("slot0").unwrap()
    ));

    loads.complete("assets/shared.bin");
    let mut ready = manager.poll();
    ready.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(ready, expected);
    assert_eq!(slots_b.get("slot0").unwrap().bytes(), Some(&b"assets/shared.bin"[..]));
}

#[test]
fn re_adding_component_does_not_inflate_pending() {
    let (mut manager, loads) = manager_with(&["bin"]);
    let key = keys(1)[0];
    let mut first = slots(&["a.bin"]);
    let mut again = slots(&["a.bin"]);

    assert_eq!(manager.add(key, &mut first), 1);
    assert_eq!(manager.add(key, &mut again), 1);
    assert_eq!(manager.pending_count(key), 1);
    assert_eq!(loads.count(), 1);

    loads.complete("assets/a.bin");
    assert_eq!(manager.poll(), [key]);
    assert_eq!(manager.pending_count(key), 0);
}

#[test]
fn re_adding_component_counts_only_new_resources() {
    let (mut manager, loads) = manager_with(&["bin"]);
    let key = keys(1)[0];
    manager.add(key, &mut slots(&["a.bin"]));
    assert_eq!(manager.add(key, &mut slots(&["a.bin", "b.bin"])), 2);

    loads.complete("assets/a.bin");
    assert!(manager.poll().is_empty());
    loads.complete("assets/b.bin");
    assert_eq!(manager.poll(), [key]);
}

#[test]
fn same_file_in_two_slots_counts_once() {
    let (mut manager, loads) = manager_with(&["bin"]);
    let key = keys(1)[0];
    let mut declared = slots(&["a.bin", "a.bin"]);

    assert_eq!(manager.add(key, &mut declared), 1);
    assert_eq!(loads.count(), 1);

    loads.complete("assets/a.bin");
    assert_eq!(manager.poll(), [key]);
}

// ============================================================================
// Completion Order
// ============================================================================

#[test]
fn ready_fires_once_for_every_completion_order() {
    for n in 1..=5 {
        let files: Vec<String> = (0..n).map(|i| format!("r{i}.bin")).collect();
        let file_refs: Vec<&str> = files.iter().map(String::as_str).collect();
        let order: Vec<usize> = (0..n).collect();

        for permutation in permutations(&order) {
            let (mut manager, loads) = manager_with(&["bin"]);
            let key = keys(1)[0];
            let mut declared = slots(&file_refs);
            assert_eq!(manager.add(key, &mut declared), n);

            let mut fired = 0;
            for (step, &i) in permutation.iter().enumerate() {
                loads.complete(&format!("{BASE}{}", files[i]));
                let ready = manager.poll();
                fired += ready.len();
                if step + 1 < n {
                    assert!(ready.is_empty(), "fired early for {permutation:?}");
                    assert_eq!(manager.pending_count(key), n - step - 1);
                } else {
                    assert_eq!(ready, [key]);
                }
            }
            assert_eq!(fired, 1, "{permutation:?}");
            assert!(!manager.is_pending(key));
            assert!(declared.all_resolved());
        }
    }
}

#[test]
fn pending_count_steps_down_per_resource() {
    let (mut manager, loads) = manager_with(&["glsl", "png"]);
    let key = keys(1)[0];
    let mut declared = slots(&["a.glsl", "b.png"]);

    assert_eq!(manager.add(key, &mut declared), 2);
    assert_eq!(manager.pending_count(key), 2);

    loads.complete("assets/a.glsl");
    assert!(manager.poll().is_empty());
    assert_eq!(manager.pending_count(key), 1);

    loads.complete("assets/b.png");
    assert_eq!(manager.poll(), [key]);
    assert_eq!(manager.pending_count(key), 0);
    assert!(!manager.is_pending(key));
}

// ============================================================================
// Shared and Resolved Resources
// ============================================================================

#[test]
fn in_flight_resource_counts_for_every_owner() {
    let (mut manager, loads) = manager_with(&["bin"]);
    let (a, b) = two_keys();

    assert_eq!(manager.add(a, &mut slots(&["a.bin"])), 1);
    assert_eq!(manager.add(b, &mut slots(&["a.bin", "b.bin"])), 2);
    assert_eq!(loads.count(), 2);

    loads.complete("assets/a.bin");
    assert_eq!(manager.poll(), [a]);
    assert_eq!(manager.pending_count(b), 1);

    loads.complete("assets/b.bin");
    assert_eq!(manager.poll(), [b]);
}

#[test]
fn resolved_resources_make_component_ready_immediately() {
    let (mut manager, loads) = manager_with(&["bin"]);
    let (a, b) = two_keys();

    manager.add(a, &mut slots(&["a.bin"]));
    loads.complete("assets/a.bin");
    assert_eq!(manager.poll(), [a]);

    let mut declared = slots(&["a.bin"]);
    assert_eq!(manager.add(b, &mut declared), 0);
    assert!(!manager.is_pending(b));
    assert_eq!(loads.count(), 0);
    assert!(declared.get("slot0").unwrap().is_resolved());
    assert!(manager.poll().is_empty());
}

// ============================================================================
// Failure Paths
// ============================================================================

#[test]
fn unknown_extension_never_resolves() {
    let (mut manager, loads) = manager_with(&["bin"]);
    let key = keys(1)[0];

    assert_eq!(manager.add(key, &mut slots(&["mesh.obj", "a.bin"])), 2);
    assert_eq!(manager.unresolved_resources(), ["mesh.obj"]);
    assert_eq!(manager.in_flight(), 1);

    loads.complete("assets/a.bin");
    assert!(manager.poll().is_empty());
    assert_eq!(manager.pending_count(key), 1);
    assert!(manager.is_pending(key));
}

#[test]
fn late_loader_registration_does_not_resolve_dispatched_resources() {
    let (mut manager, _) = manager_with(&[]);
    let key = keys(1)[0];
    manager.add(key, &mut slots(&["late.xyz"]));

    let late = HeldLoads::default();
    manager.add_loader(&["xyz"], late.clone());
    assert_eq!(late.count(), 0);
    assert!(manager.is_pending(key));
}

#[test]
fn extension_lookup_ignores_case() {
    let (mut manager, loads) = manager_with(&["bin"]);
    let key = keys(1)[0];
    manager.add(key, &mut slots(&["UPPER.BIN"]));
    assert_eq!(loads.count(), 1);
    assert!(manager.unresolved_resources().is_empty());
}

#[test]
fn dropped_request_resolves_without_data() {
    let (mut manager, loads) = manager_with(&["bin"]);
    let key = keys(1)[0];
    let mut declared = slots(&["a.bin"]);
    manager.add(key, &mut declared);

    drop(loads.take("assets/a.bin"));
    assert_eq!(manager.poll(), [key]);

    let resource = declared.get("slot0").unwrap();
    assert!(resource.is_resolved());
    assert!(resource.data().is_none());
}

#[test]
fn duplicate_completion_is_ignored() {
    let (mut manager, _loads) = manager_with(&["bin"]);
    let (a, b) = two_keys();
    manager.add(a, &mut slots(&["a.bin"]));
    manager.add(b, &mut slots(&["a.bin", "b.bin"]));

    let bytes = |s: &str| Some(ResourceData::Bytes(Arc::from(s.as_bytes())));
    assert_eq!(manager.resource_loaded("assets/a.bin", bytes("first")), [a]);
    assert!(manager.resource_loaded("assets/a.bin", bytes("second")).is_empty());
    assert_eq!(manager.pending_count(b), 1);
    assert_eq!(manager.resource("a.bin").unwrap().bytes(), Some(&b"first"[..]));
}

#[test]
fn unregistered_completion_is_ignored() {
    let (mut manager, _) = manager_with(&["bin"]);
    assert!(manager.resource_loaded("assets/nothing.bin", None).is_empty());
}

#[test]
fn closures_are_loaders() {
    let (mut manager, _) = manager_with(&[]);
    manager.add_loader(&["txt"], |path: &str, request: LoadRequest| {
        request.complete(Some(DecodedAsset::Bytes(path.as_bytes().to_vec())));
    });
    let key = keys(1)[0];
    let mut declared = slots(&["note.txt"]);
    manager.add(key, &mut declared);

    assert_eq!(manager.poll(), [key]);
    assert_eq!(declared.get("slot0").unwrap().bytes(), Some(&b"assets/note.txt"[..]));
}

#[test]
fn ready_payloads_are_stored_as_decoded() {
    let (mut manager, _) = manager_with(&[]);
    manager.add_loader(&["cfg"], |_path: &str, request: LoadRequest| {
        let value: Arc<dyn std::any::Any + Send + Sync> = Arc::new(42u32);
        request.complete(Some(DecodedAsset::Ready(ResourceData::Custom(value))));
    });
    let key = keys(1)[0];
    let mut declared = slots(&["answer.cfg"]);
    manager.add(key, &mut declared);

    assert_eq!(manager.poll(), [key]);
    let resource = declared.get("slot0").unwrap();
    assert_eq!(resource.custom::<u32>(), Some(&42));
    assert!(resource.custom::<String>().is_none());
    assert!(resource.bytes().is_none());
}

// ============================================================================
// Scene Integration
// ============================================================================

#[derive(Default)]
struct Counters {
    loads: AtomicUsize,
    updates: AtomicUsize,
    draws: AtomicUsize,
}

struct Tracker {
    state: ComponentState,
    resources: ResourceSlots,
    counters: Arc<Counters>,
}

impl Tracker {
    fn new(files: &[&str], counters: &Arc<Counters>) -> Self {
        Self {
            state: ComponentState::default(),
            resources: slots(files),
            counters: counters.clone(),
        }
    }
}

impl Component for Tracker {
    fn state(&self) -> &ComponentState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ComponentState {
        &mut self.state
    }

    fn resources_mut(&mut self) -> &mut ResourceSlots {
        &mut self.resources
    }

    fn on_load(&mut self) {
        assert!(self.resources.all_resolved());
        self.counters.loads.fetch_add(1, Ordering::SeqCst);
    }

    fn update(&mut self, _frame: &FrameContext) {
        self.counters.updates.fetch_add(1, Ordering::SeqCst);
    }

    fn draw(&mut self, _frame: &FrameContext) {
        self.counters.draws.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn scene_calls_on_load_after_last_resource() {
    let (manager, loads) = manager_with(&["glsl", "png"]);
    let mut scene = Scene::new(manager);
    let counters = Arc::new(Counters::default());
    let key = scene.add(Tracker::new(&["a.glsl", "b.png"], &counters));

    loads.complete("assets/a.glsl");
    assert!(scene.poll().is_empty());
    assert_eq!(counters.loads.load(Ordering::SeqCst), 0);
    assert!(!scene.is_loaded(key));

    loads.complete("assets/b.png");
    assert_eq!(scene.poll(), [key]);
    assert_eq!(counters.loads.load(Ordering::SeqCst), 1);
    assert!(scene.is_loaded(key));

    assert!(scene.poll().is_empty());
    assert_eq!(counters.loads.load(Ordering::SeqCst), 1);
}

#[test]
fn scene_loads_component_without_resources_immediately() {
    let (manager, _) = manager_with(&[]);
    let mut scene = Scene::new(manager);
    let counters = Arc::new(Counters::default());
    let key = scene.add(Tracker::new(&[], &counters));

    assert!(scene.is_loaded(key));
    assert_eq!(counters.loads.load(Ordering::SeqCst), 1);
}

#[test]
fn frame_updates_and_draws_by_flags() {
    let (manager, loads) = manager_with(&["bin"]);
    let mut scene = Scene::new(manager);
    let counters = Arc::new(Counters::default());
    let key = scene.add(Tracker::new(&["a.bin"], &counters));

    let frame = FrameContext::default();
    scene.update(&frame);
    scene.draw(&frame);
    assert_eq!(counters.updates.load(Ordering::SeqCst), 0);
    assert_eq!(counters.draws.load(Ordering::SeqCst), 0);

    loads.complete("assets/a.bin");
    let used = scene.frame(glam::Mat4::IDENTITY, glam::Mat4::IDENTITY, glam::Vec3::ZERO);
    assert_eq!(used.frame, 1);
    assert_eq!(counters.updates.load(Ordering::SeqCst), 1);
    assert_eq!(counters.draws.load(Ordering::SeqCst), 1);

    scene.get_mut(key).unwrap().state_mut().visible = false;
    scene.frame(glam::Mat4::IDENTITY, glam::Mat4::IDENTITY, glam::Vec3::ZERO);
    assert_eq!(counters.updates.load(Ordering::SeqCst), 2);
    assert_eq!(counters.draws.load(Ordering::SeqCst), 1);

    scene.get_mut(key).unwrap().state_mut().enabled = false;
    scene.frame(glam::Mat4::IDENTITY, glam::Mat4::IDENTITY, glam::Vec3::ZERO);
    assert_eq!(counters.updates.load(Ordering::SeqCst), 2);
    assert_eq!(scene.timing().frame_count, 3);
}

#[test]
fn removed_component_is_not_notified() {
    let (manager, loads) = manager_with(&["bin"]);
    let mut scene = Scene::new(manager);
    let counters = Arc::new(Counters::default());
    let key = scene.add(Tracker::new(&["a.bin"], &counters));

    assert!(scene.remove(key).is_some());
    loads.complete("assets/a.bin");
    assert!(scene.poll().is_empty());
    assert_eq!(counters.loads.load(Ordering::SeqCst), 0);
    assert_eq!(scene.resources().pending_components(), 0);
}
