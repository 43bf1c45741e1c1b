/*!
# RAAM DevKit - Stubs et Utilitaires pour Développement

Bibliothèque facilitant les tests du nœud relais sans infrastructure réelle:
- Stub du backend REST de persistance (pas besoin d'un projet Supabase)
- Générateurs de payloads OBU conformes au format de lien
*/

pub mod backend_stub;
pub mod report_builder;

pub use backend_stub::BackendStub;
pub use report_builder::ObuMessageBuilder;

/// Initialise le logging pour les tests (idempotent).
pub fn init_test_logging() {
    env_logger::try_init().ok();
}
