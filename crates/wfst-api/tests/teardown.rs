// Global teardown runs in its own process so it cannot race the other
// boundary tests over the shared tables.

use wfst_api::boundary;

#[test]
fn teardown_invalidates_every_handle() {
    let a = boundary::compile("ab");
    let b = boundary::compile("cd");
    let f = boundary::freeze(a);
    assert_ne!(a, boundary::INVALID_HANDLE);
    assert_ne!(f, boundary::INVALID_HANDLE);

    boundary::teardown();

    assert_eq!(boundary::mutable_free(a), boundary::Status::InvalidArg);
    assert_eq!(boundary::mutable_free(b), boundary::Status::InvalidArg);
    assert_eq!(boundary::frozen_free(f), boundary::Status::InvalidArg);

    // The tables keep working after teardown.
    let fresh = boundary::compile("xy");
    assert_eq!(boundary::print(fresh).unwrap(), "xy");
}
