//! Declaración del ciclo de vida de tareas.
//!
//! El fixture de integración: curso principal con inputs encadenados, un
//! split de facturación/control con joiner, un multiplexer por tipo de
//! servicio, y un split anidado de aprobación/auditoría dentro del curso de
//! control. Ejercita permisos por transición y por nodo, handlers de
//! llegada y joins forzados.

use serde_json::{json, Value};

/// Declaración completa, lista para `install_value`.
pub fn task_lifecycle_declaration() -> Value {
    json!({
        "model": "sample.Task",
        "code": "task-lifecycle",
        "name": "Task Lifecycle",
        "description": "Review, assignment and delivery of tasks",
        "createPermission": "sample.create_task",
        "cancelPermission": "sample.cancel_task",
        "courses": [
            {
                "code": "", "name": "Main", "description": "Main task flow",
                "nodes": [
                    { "type": "enter", "code": "created", "name": "Created",
                      "description": "The task was just created; yet to review" },
                    { "type": "input", "code": "reviewed", "name": "Reviewed",
                      "description": "Reviewed; yet to be assigned" },
                    { "type": "input", "code": "assigned", "name": "Assigned",
                      "description": "Assigned; yet to be started" },
                    { "type": "input", "code": "started", "name": "Started",
                      "description": "Started; yet to be completed" },
                    { "type": "step", "code": "completed", "name": "Completed",
                      "description": "Completed; post-complete bookkeeping" },
                    { "type": "split", "code": "invoice-control", "name": "Invoice/Control",
                      "description": "Invoicing and control run in parallel",
                      "branches": ["control", "invoice"],
                      "joiner": "sample.support.invoice_control_joiner" },
                    { "type": "multiplexer", "code": "service-type", "name": "Service Type" },
                    { "type": "input", "code": "pending-delivery", "name": "Pending Delivery",
                      "description": "The product is about to be delivered",
                      "landingHandler": "sample.support.on_pending_delivery" },
                    { "type": "input", "code": "pending-pick", "name": "Pending Customer Pick",
                      "description": "The product is about to be picked" },
                    { "type": "step", "code": "notify", "name": "Notify" },
                    { "type": "exit", "code": "finished", "name": "Finished", "exitValue": 105 },
                    { "type": "cancel", "code": "cancel", "name": "Cancel" }
                ],
                "transitions": [
                    { "origin": "created", "destination": "reviewed", "name": "Review",
                      "permission": "sample.review_task" },
                    { "origin": "reviewed", "destination": "assigned", "name": "Assign",
                      "actionName": "assign", "permission": "sample.create_task" },
                    { "origin": "assigned", "destination": "started", "name": "Start",
                      "actionName": "start", "permission": "sample.start_task" },
                    { "origin": "started", "destination": "completed", "name": "Complete",
                      "actionName": "complete", "permission": "sample.complete_task" },
                    { "origin": "completed", "destination": "invoice-control", "name": "Open I/C split" },
                    { "origin": "invoice-control", "destination": "started", "name": "On Reject",
                      "actionName": "on-reject" },
                    { "origin": "invoice-control", "destination": "service-type", "name": "On Accept",
                      "actionName": "on-accept" },
                    { "origin": "service-type", "destination": "pending-delivery", "name": "Is deliverable?",
                      "priority": 1, "condition": "sample.support.is_deliverable" },
                    { "origin": "service-type", "destination": "pending-pick", "name": "Is non-deliverable?",
                      "priority": 2, "condition": "sample.support.is_non_deliverable" },
                    { "origin": "service-type", "destination": "notify", "name": "Is service?",
                      "priority": 3, "condition": "sample.support.is_service" },
                    { "origin": "pending-delivery", "destination": "notify", "name": "Deliver",
                      "actionName": "deliver", "permission": "sample.deliver_task" },
                    { "origin": "pending-pick", "destination": "notify", "name": "Pick and attend",
                      "actionName": "pick-attend", "permission": "sample.pick_attend_task" },
                    { "origin": "notify", "destination": "finished", "name": "Finish" }
                ]
            },
            {
                "code": "control", "name": "Control", "description": "Control branch",
                "nodes": [
                    { "type": "enter", "code": "origin", "name": "Origin" },
                    { "type": "split", "code": "approve-audit", "name": "Approve/Audit",
                      "description": "Approval and audit run in parallel",
                      "branches": ["approval", "audit"],
                      "joiner": "sample.support.approve_audit_joiner" },
                    { "type": "exit", "code": "was-rejected", "name": "Was Rejected", "exitValue": 100 },
                    { "type": "exit", "code": "was-satisfied", "name": "Was Satisfied", "exitValue": 101 },
                    { "type": "cancel", "code": "cancel", "name": "Cancel" },
                    { "type": "joined", "code": "joined", "name": "Joined" }
                ],
                "transitions": [
                    { "origin": "origin", "destination": "approve-audit", "name": "Open A/A split" },
                    { "origin": "approve-audit", "destination": "was-rejected", "name": "Rejected",
                      "actionName": "rejected" },
                    { "origin": "approve-audit", "destination": "was-satisfied", "name": "Satisfied",
                      "actionName": "satisfied" }
                ]
            },
            {
                "code": "invoice", "name": "Invoice", "description": "Invoicing branch",
                "nodes": [
                    { "type": "enter", "code": "origin", "name": "Origin" },
                    { "type": "input", "code": "invoicing", "name": "Invoicing" },
                    { "type": "exit", "code": "invoiced", "name": "Invoiced", "exitValue": 100 },
                    { "type": "cancel", "code": "cancel", "name": "Cancel" },
                    { "type": "joined", "code": "joined", "name": "Joined" }
                ],
                "transitions": [
                    { "origin": "origin", "destination": "invoicing", "name": "Wait for invoice" },
                    { "origin": "invoicing", "destination": "invoiced", "name": "Invoice",
                      "actionName": "invoice" }
                ]
            },
            {
                "code": "approval", "name": "Approval", "description": "Approval branch",
                "nodes": [
                    { "type": "enter", "code": "origin", "name": "Origin" },
                    { "type": "input", "code": "deciding", "name": "Deciding" },
                    { "type": "exit", "code": "approved", "name": "Approved", "exitValue": 101 },
                    { "type": "exit", "code": "rejected", "name": "Rejected", "exitValue": 102 },
                    { "type": "cancel", "code": "cancel", "name": "Cancel" },
                    { "type": "joined", "code": "joined", "name": "Joined" }
                ],
                "transitions": [
                    { "origin": "origin", "destination": "deciding", "name": "Wait for decision" },
                    { "origin": "deciding", "destination": "approved", "name": "Approve",
                      "actionName": "approve" },
                    { "origin": "deciding", "destination": "rejected", "name": "Reject",
                      "actionName": "reject" }
                ]
            },
            {
                "code": "audit", "name": "Audit", "description": "Audit branch",
                "nodes": [
                    { "type": "enter", "code": "origin", "name": "Origin" },
                    { "type": "input", "code": "auditing", "name": "Auditing" },
                    { "type": "exit", "code": "audited", "name": "Audited", "exitValue": 100 },
                    { "type": "cancel", "code": "cancel", "name": "Cancel" },
                    { "type": "joined", "code": "joined", "name": "Joined" }
                ],
                "transitions": [
                    { "origin": "origin", "destination": "auditing", "name": "Wait for audit" },
                    { "origin": "auditing", "destination": "audited", "name": "Audit",
                      "actionName": "audit" }
                ]
            }
        ]
    })
}
