use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ember_config::InterpreterConfig;
use ember_core::{IoFlags, Vec3};
use ember_scripting::{Script, ScriptEngine, Services};
use ember_world::{EntityManager, EventQueue, ManualClock, ZoneMap};
use std::sync::Arc;

const SOURCE: &str = "
on compare {
  if #hp > 10 {
    if $name == guard nop
    else nop
  }
  if ^me iselement \"guard captain\" accept
  refuse
}

on shout {
  sendevent -r 500 alert ~^me~
}
";

fn setup(crowd: usize) -> (EntityManager, ScriptEngine, Arc<ember_core::Entity>) {
    let entities = EntityManager::new();
    let guard = entities.spawn("guard", IoFlags::NPC, |e| e.at(Vec3::ZERO));
    for i in 0..crowd {
        let x = (i % 40) as f32 * 20.0;
        let z = (i / 40) as f32 * 20.0;
        entities.spawn(format!("npc{}", i), IoFlags::NPC, |e| e.at(Vec3::new(x, 0.0, z)));
    }

    let mut engine = ScriptEngine::new(InterpreterConfig {
        rng_seed: Some(1),
        ..Default::default()
    });
    engine.attach(guard.id, Arc::new(Script::new("guard.asl", SOURCE)));
    (entities, engine, guard)
}

fn bench_if(c: &mut Criterion) {
    let (entities, mut engine, guard) = setup(0);
    let zones = ZoneMap::new();
    let clock = ManualClock::new(0);
    let mut queue = EventQueue::new();

    c.bench_function("if_chain", |b| {
        b.iter(|| {
            let mut services = Services::new(&entities, &zones, &mut queue, &clock);
            black_box(engine.send_event(&mut services, Some(guard.id), "compare", ""))
        })
    });
}

fn bench_sendevent(c: &mut Criterion) {
    let (entities, mut engine, guard) = setup(400);
    let zones = ZoneMap::new();
    let clock = ManualClock::new(0);
    let mut queue = EventQueue::new();

    c.bench_function("sendevent_radius_400", |b| {
        b.iter(|| {
            let mut services = Services::new(&entities, &zones, &mut queue, &clock);
            let outcome = engine.send_event(&mut services, Some(guard.id), "shout", "");
            black_box(queue.drain().len());
            outcome
        })
    });
}

criterion_group!(benches, bench_if, bench_sendevent);
criterion_main!(benches);
