//! A tiny "database" of people and classes built on two stores.
//!
//! Run with `cargo run --example school`.

use anyhow::Context;
use keystore::KeyStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Row of the people table
#[derive(Debug)]
struct Person {
    name: String,
    age: u32,
}

/// Row of the class table, referencing people by id
#[derive(Debug)]
struct Class {
    name: String,
    teacher: u32,
    students: Vec<u32>,
}

fn person(name: &str, age: u32) -> Arc<Person> {
    Arc::new(Person {
        name: name.to_string(),
        age,
    })
}

fn lookup(people: &KeyStore<u32, Arc<Person>>, id: u32) -> anyhow::Result<Arc<Person>> {
    people.get(&id).with_context(|| format!("no person with id {}", id))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // u32 primary keys for both tables
    let people = KeyStore::<u32, Arc<Person>>::new();
    let classes = KeyStore::<u32, Arc<Class>>::new();

    for (id, row) in [
        (0, person("bob baker", 80)),
        (1, person("drew carey", 45)),
        (2, person("alex trebeck", 64)),
    ] {
        people.put(id, row);
    }

    classes.put(
        0,
        Arc::new(Class {
            name: "Public Speech".to_string(),
            teacher: 0,
            students: vec![1, 2],
        }),
    );

    // A substitute only on the roster for a moment
    people.put_expires(3, person("pat sajak", 77), Duration::from_millis(100));
    info!("Loaded {} people and {} classes", people.len(), classes.len());

    let class = classes.get(&0).context("class 0 missing")?;
    println!("{}:", class.name);

    let teacher = lookup(&people, class.teacher)?;
    println!("  Teacher: {}", teacher.name);

    println!("Students:");
    for &id in &class.students {
        let student = lookup(&people, id)?;
        println!("  {}, Age: {}", student.name, student.age);
    }

    std::thread::sleep(Duration::from_millis(200));
    if !people.contains_key(&3) {
        info!("Substitute record expired");
    }

    Ok(())
}
