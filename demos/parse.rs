use otpauth_uri::{Assume, Descriptor};

fn main() {
    let uri = std::env::args().nth(1).unwrap_or_else(|| {
        "otpauth://totp/ACME%20Co:john.doe%40email.com?secret=HXDMVJECJJWSRB3HWIZR4IFUGFTMXBOZ&issuer=ACME%20Co".to_string()
    });

    let descriptor = match Descriptor::from_uri_assuming(&uri, Assume::Username) {
        Ok(descriptor) => descriptor,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };

    println!("issuer:\t\t{}", descriptor.issuer());
    println!("account:\t{}", descriptor.account_name());
    println!("algorithm:\t{}", descriptor.algorithm());
    println!("digits:\t\t{}", descriptor.digits());
    println!("period:\t\t{}", descriptor.period());
    println!("uri:\t\t{}", descriptor);
    println!("decoded:\t{}", descriptor.to_uri_decoded());

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    // most secrets in the wild are base32, fall back to the raw text otherwise
    match descriptor.generate_decoded(now) {
        Ok(code) => println!("code:\t\t{}", code),
        Err(_) => println!("code:\t\t{}", descriptor.generate_split(now)),
    }
}
