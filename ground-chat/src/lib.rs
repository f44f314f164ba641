//! Chat sessions grounded on a cached retrieval context.
//!
//! A [`ChatSession`] starts `Uninitialized`. Its first message is used as a
//! search query: the [`ConversationController`] retrieves documents, stores
//! them in a TTL-scoped provider cache ([`SessionCache`]) and binds a
//! [`ModelHandle`] to it. Every later message is answered by that handle
//! against the accumulated history.
//!
//! # Examples
//! ```no_run
//! use ground_chat::{ChatSession, ConversationController, Reply};
//!
//! # async fn demo(controller: ConversationController) -> ground_common::Result<()> {
//! let mut session = ChatSession::new();
//! let first = controller.handle(&mut session, "bitcoin price today").await?;
//! assert!(matches!(first, Reply::Initialized { .. }));
//! let answer = controller.handle(&mut session, "what's the current price").await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```
mod cache;
mod controller;
mod handle;
mod session;

pub use cache::SessionCache;
pub use controller::{ConversationController, Reply, SessionSettings};
pub use handle::ModelHandle;
pub use session::{ChatSession, SessionState};
