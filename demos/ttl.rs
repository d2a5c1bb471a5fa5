use otpauth_uri::DescriptorBuilder;

fn main() {
    let mut builder = DescriptorBuilder::default();
    builder.secret("my-secret".to_string());
    builder.issuer("issuer".to_string());
    builder.account_name("account".to_string());
    builder.period(15).unwrap();
    let descriptor = builder.build().unwrap();

    loop {
        println!(
            "code {}\t ttl {}\t valid until: {}",
            descriptor.generate_split_current().unwrap(),
            descriptor.ttl().unwrap(),
            descriptor.next_step_current().unwrap()
        );
        std::thread::sleep(std::time::Duration::from_secs(1));
    }
}
