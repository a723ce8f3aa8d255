//! # System Lifecycle
//!
//! Starts, wires and stops the stores behind the service.
//!
//! Wiring happens in two steps so stores can depend on each other without
//! construction-order problems:
//!
//! 1. **Create** every actor and its client. Nothing runs yet.
//! 2. **Start** each actor with its context: kinds holding references get
//!    the referenced kind's client, so `employees` can check that a
//!    department exists.
//!
//! ```text
//! departments ◄── employees
//! questions   ◄── choices, marks
//! products
//! ```
//!
//! The clients are then wrapped in [`ResourceHandler`]s sharing one
//! [`Cascader`] that knows every store and the relations between them.
//!
//! ## Graceful Shutdown
//!
//! [`ResourceSystem::shutdown`] drops the handlers, which drops the last
//! senders of every channel; each actor sees its channel close, logs its final
//! size and exits. The dependency graph is acyclic, so a store held in another
//! store's context still closes once that store has exited.
//!
//! Handlers cloned elsewhere (the router keeps its own) must be dropped before
//! `shutdown` can complete.

use resource_framework::{
    Cascade, Cascader, PermissionGate, Relation, Resource, ResourceActor, ResourceClient,
    ResourceHandler,
};
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info};

use crate::model::{Choice, Department, Employee, Marks, Product, Question};

/// Failures while stopping the system.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Store task failed: {0}")]
    TaskFailed(#[from] JoinError),
}

/// Every store of the service, started and wired.
///
/// # Example
///
/// ```rust
/// use resource_framework::{Caller, PermissionGate};
/// use resource_service::lifecycle::ResourceSystem;
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() {
/// let system = ResourceSystem::new(16, PermissionGate::default());
///
/// let admin = Caller::elevated("admin");
/// let sales = system
///     .departments
///     .create(Some(&admin), &json!({"name": "Sales"}))
///     .await
///     .unwrap();
/// assert_eq!(sales["url"], "/departments/1");
///
/// system.shutdown().await.unwrap();
/// # }
/// ```
pub struct ResourceSystem {
    pub products: ResourceHandler<Product>,
    pub departments: ResourceHandler<Department>,
    pub employees: ResourceHandler<Employee>,
    pub questions: ResourceHandler<Question>,
    pub choices: ResourceHandler<Choice>,
    pub marks: ResourceHandler<Marks>,

    /// Task handles for all running stores (used for graceful shutdown)
    handles: Vec<JoinHandle<()>>,
}

impl ResourceSystem {
    /// Spawns one store per kind, each with a channel of `capacity` pending
    /// requests, and builds the handlers around them.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(capacity: usize, gate: PermissionGate) -> Self {
        // 1. Create actors (no dependencies)
        let (product_actor, products) = ResourceActor::<Product>::new(capacity);
        let (department_actor, departments) = ResourceActor::<Department>::new(capacity);
        let (employee_actor, employees) = ResourceActor::<Employee>::new(capacity);
        let (question_actor, questions) = ResourceActor::<Question>::new(capacity);
        let (choice_actor, choices) = ResourceActor::<Choice>::new(capacity);
        let (marks_actor, marks) = ResourceActor::<Marks>::new(capacity);

        // 2. Start actors with injected context
        let handles = vec![
            tokio::spawn(product_actor.run(())),
            tokio::spawn(department_actor.run(())),
            tokio::spawn(employee_actor.run(departments.clone())),
            tokio::spawn(question_actor.run(())),
            tokio::spawn(choice_actor.run(questions.clone())),
            tokio::spawn(marks_actor.run(questions.clone())),
        ];

        // 3. Relations between the stores
        let cascader = Arc::new(
            Cascader::new()
                .register(products.clone())
                .register(departments.clone())
                .register(employees.clone())
                .register(questions.clone())
                .register(choices.clone())
                .register(marks.clone())
                .relate(
                    Relation::new(Employee::KIND, "department", Department::KIND)
                        .with(Cascade::DeleteChildren),
                )
                .relate(
                    Relation::new(Choice::KIND, "question", Question::KIND)
                        .with(Cascade::DeleteChildren)
                        .with(Cascade::DeleteChildlessParent),
                )
                .relate(
                    Relation::new(Marks::KIND, "question", Question::KIND)
                        .with(Cascade::DeleteChildren),
                ),
        );

        info!(stores = handles.len(), "System started");

        Self {
            products: handler(products, &gate, &cascader),
            departments: handler(departments, &gate, &cascader),
            employees: handler(employees, &gate, &cascader),
            questions: handler(questions, &gate, &cascader),
            choices: handler(choices, &gate, &cascader),
            marks: handler(marks, &gate, &cascader),
            handles,
        }
    }

    /// Closes every store and waits for it to finish.
    ///
    /// Returns an error if any store task panicked.
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!("Shutting down system...");

        // Dropping the handlers drops the senders (including the cascader's),
        // so each actor's receiver returns None.
        drop(self.products);
        drop(self.departments);
        drop(self.employees);
        drop(self.questions);
        drop(self.choices);
        drop(self.marks);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Store task failed");
                return Err(e.into());
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}

fn handler<T: Resource>(
    store: ResourceClient<T>,
    gate: &PermissionGate,
    cascader: &Arc<Cascader>,
) -> ResourceHandler<T> {
    ResourceHandler::new(store, gate.clone()).with_cascade(Arc::clone(cascader))
}
