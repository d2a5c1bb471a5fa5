use otpauth_uri::{Descriptor, Secret};

fn main() {
    let descriptor =
        Descriptor::from_uri("otpauth://totp/Acme:bob?secret=OBWGC2LOFVZXI4TJNZTS243FMNZGK5BNGEZDG")
            .unwrap();

    // the descriptor signs with the secret text as-is
    println!(
        "code from secret text:\t{}",
        descriptor.generate_current().unwrap()
    );

    // authenticator apps decode it as base32 first
    let secret_b32 = Secret::Encoded(descriptor.secret().to_string());
    println!(
        "base32 {} ; raw {}",
        secret_b32,
        secret_b32.to_raw().unwrap()
    );
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    println!(
        "code from base32:\t{}",
        descriptor.generate_decoded(time).unwrap()
    );
}
