pub mod registry_maint;
pub mod registry_stats;
