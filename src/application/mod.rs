// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Workflow coordination only: no tensor math and no printing.
// Each use case wires data, infra and ml together for one
// command.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;

// Answering a question about one image
pub mod ask_use_case;
