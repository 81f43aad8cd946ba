use shadow_rs::ShadowBuilder;

fn main() {
    // Build metadata behind `courier --version`
    ShadowBuilder::builder()
        .build()
        .expect("Failed to generate build metadata");
}
